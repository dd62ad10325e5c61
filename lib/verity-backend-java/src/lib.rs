//! The JVM-class backend: emits Java source. Generics are erased (the JVM
//! itself erases them at runtime, so the driver's reified type descriptors
//! are simply discarded here rather than threaded through).

use std::collections::HashSet;

use verity_core::{Backend, BraceStyle, Capabilities, FormalText, StringRepr, Target};
use verity_emit::{EmitResult, Substrate, WriterId};
use verity_rir::{BinaryOp, CollectionKind, QuantifierKind, Type, UnaryOp};

const RUNTIME_SOURCE: &str = include_str!("../runtime/VerityRuntime.java");

const RESERVED: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try",
    "void", "volatile", "while", "var", "record", "yield", "true", "false", "null",
];

pub struct JavaBackend;

impl Backend for JavaBackend {
    fn target(&self) -> Target {
        Target::Java
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            erased_generics: true,
            native_int_widths: &[8, 16, 32, 64],
            trait_typed_collections: true,
            native_codatatypes: false,
            labeled_loops: true,
            max_tuple_arity: Some(8),
            string_repr: StringRepr::Object,
        }
    }

    fn runtime_resource(&self) -> (&'static str, &'static str) {
        ("VerityRuntime.java", RUNTIME_SOURCE)
    }

    fn open_module(&self, sub: &mut Substrate, parent: WriterId, name: &str) -> EmitResult<WriterId> {
        sub.write(parent, &format!("package {};\n\n", name.to_lowercase()))?;
        Ok(parent)
    }

    fn open_class(&self, sub: &mut Substrate, parent: WriterId, name: &str, implements: &[String]) -> EmitResult<WriterId> {
        let header = if implements.is_empty() {
            format!("public class {} {{", name)
        } else {
            format!("public class {} implements {} {{", name, implements.join(", "))
        };
        sub.new_block(parent, &header, "}", BraceStyle::SameLine, BraceStyle::NewLine)
    }

    fn open_member(&self, sub: &mut Substrate, parent: WriterId, signature: &str) -> EmitResult<WriterId> {
        sub.new_block(parent, &format!("{} {{", signature), "}", BraceStyle::SameLine, BraceStyle::NewLine)
    }

    fn declare_field(
        &self,
        sub: &mut Substrate,
        parent: WriterId,
        name: &str,
        ty: &Type,
        is_static: bool,
        is_const: bool,
        has_initializer: bool,
    ) -> EmitResult<(WriterId, Option<WriterId>)> {
        let modifiers = match (is_static, is_const) {
            (true, true) => "public static final",
            (true, false) => "public static",
            (false, true) => "public final",
            (false, false) => "public",
        };
        let decl_line = sub.fork(parent)?;
        let init_fork = if has_initializer {
            sub.write(decl_line, &format!("{} {} {} = ", modifiers, self.type_name(ty), name))?;
            let f = sub.fork(decl_line)?;
            sub.write(decl_line, ";\n")?;
            Some(f)
        } else {
            sub.write(decl_line, &format!("{} {} {};\n", modifiers, self.type_name(ty), name))?;
            None
        };
        Ok((decl_line, init_fork))
    }

    fn declare_local(&self, sub: &mut Substrate, parent: WriterId, name: &str, ty: &Type, init: Option<&str>) -> EmitResult<()> {
        match init {
            Some(rhs) => sub.write(parent, &format!("{} {} = {};\n", self.type_name(ty), name, rhs)),
            None => sub.write(parent, &format!("{} {};\n", self.type_name(ty), name)),
        }
    }

    fn format_formal(&self, name: &str, ty: &Type) -> FormalText {
        format!("{} {}", self.type_name(ty), name)
    }

    fn declare_datatype_base(&self, sub: &mut Substrate, parent: WriterId, name: &str) -> EmitResult<WriterId> {
        sub.new_block(parent, &format!("public abstract class {} {{", name), "}", BraceStyle::SameLine, BraceStyle::NewLine)
    }

    fn declare_datatype_variant(
        &self,
        sub: &mut Substrate,
        parent: WriterId,
        base_name: &str,
        ctor_name: &str,
        formals: &[FormalText],
        fields: &[(String, Type)],
        co_inductive: bool,
    ) -> EmitResult<WriterId> {
        let header = format!(
            "public static final class {} extends {} {{",
            ctor_name, base_name
        );
        let class = sub.new_block(parent, &header, "}", BraceStyle::SameLine, BraceStyle::NewLine)?;
        for formal in formals {
            sub.write(class, &format!("public final {};\n", formal))?;
        }
        let ctor_params = formals.join(", ");
        let ctor_header = format!("public {}({}) {{", ctor_name, ctor_params);
        let ctor_body = sub.new_block(class, &ctor_header, "}", BraceStyle::SameLine, BraceStyle::NewLine)?;
        for (name, _) in fields {
            sub.write(ctor_body, &format!("this.{} = {};\n", name, name))?;
        }
        sub.write(class, &format!("public boolean is_{}() {{ return true; }}\n", ctor_name))?;
        for (name, ty) in fields {
            let ret = self.type_name(ty);
            if co_inductive {
                sub.write(class, &format!("public {} dtor_{}() {{ return ({}) this.{}.get(); }}\n", ret, name, ret, name))?;
            } else {
                sub.write(class, &format!("public {} dtor_{}() {{ return this.{}; }}\n", ret, name, name))?;
            }
        }
        Ok(class)
    }

    fn declare_newtype(&self, sub: &mut Substrate, parent: WriterId, name: &str, base: &Type, default_value: &str) -> EmitResult<()> {
        sub.write(
            parent,
            &format!(
                "public static final {} DEFAULT_{} = {};\n",
                self.type_name(base),
                name.to_uppercase(),
                default_value
            ),
        )
    }

    fn declare_subset_type(&self, sub: &mut Substrate, parent: WriterId, name: &str, base: &Type, default_value: &str) -> EmitResult<()> {
        self.declare_newtype(sub, parent, name, base, default_value)
    }

    fn emit_assign(&self, sub: &mut Substrate, w: WriterId, lhs: &str, rhs: &str) -> EmitResult<()> {
        sub.write(w, &format!("{} = {};\n", lhs, rhs))
    }

    fn emit_multi_assign(&self, sub: &mut Substrate, w: WriterId, lhs: &[String], call: &str) -> EmitResult<()> {
        sub.write(w, &format!("var __t = {};\n", call))?;
        for (i, name) in lhs.iter().enumerate() {
            sub.write(w, &format!("{} = __t.out{}();\n", name, i))?;
        }
        Ok(())
    }

    fn emit_if(&self, sub: &mut Substrate, w: WriterId, cond: &str) -> EmitResult<(WriterId, WriterId)> {
        let then_w = sub.new_block(w, &format!("if ({}) {{", cond), "}", BraceStyle::SameLine, BraceStyle::NewLine)?;
        let else_w = sub.new_block(w, "else {", "}", BraceStyle::SameLine, BraceStyle::NewLine)?;
        Ok((then_w, else_w))
    }

    fn emit_while(&self, sub: &mut Substrate, w: WriterId, cond: &str) -> EmitResult<WriterId> {
        sub.new_block(w, &format!("while ({}) {{", cond), "}", BraceStyle::SameLine, BraceStyle::NewLine)
    }

    fn emit_for_range(&self, sub: &mut Substrate, w: WriterId, var: &str, lo: &str, hi: &str) -> EmitResult<WriterId> {
        let header = format!("for (java.math.BigInteger {v} = {lo}; {v}.compareTo({hi}) < 0; {v} = {v}.add(java.math.BigInteger.ONE)) {{", v = var, lo = lo, hi = hi);
        sub.new_block(w, &header, "}", BraceStyle::SameLine, BraceStyle::NewLine)
    }

    fn emit_for_each(&self, sub: &mut Substrate, w: WriterId, var: &str, collection: &str) -> EmitResult<WriterId> {
        sub.new_block(w, &format!("for (var {} : {}) {{", var, collection), "}", BraceStyle::SameLine, BraceStyle::NewLine)
    }

    fn emit_loop(&self, sub: &mut Substrate, w: WriterId, label: Option<&str>) -> EmitResult<WriterId> {
        let header = match label {
            Some(l) => format!("{}: while (true) {{", l),
            None => "while (true) {".to_string(),
        };
        sub.new_block(w, &header, "}", BraceStyle::SameLine, BraceStyle::NewLine)
    }

    fn emit_break(&self, sub: &mut Substrate, w: WriterId, label: Option<&str>) -> EmitResult<()> {
        match label {
            Some(l) => sub.write(w, &format!("continue {};\n", l)),
            None => sub.write(w, "break;\n"),
        }
    }

    fn emit_return(&self, sub: &mut Substrate, w: WriterId, values: &[String]) -> EmitResult<()> {
        match values.len() {
            0 => sub.write(w, "return;\n"),
            1 => sub.write(w, &format!("return {};\n", values[0])),
            _ => sub.write(w, &format!("return new Tuple{}<>({});\n", values.len(), values.join(", "))),
        }
    }

    fn emit_yield(&self, sub: &mut Substrate, w: WriterId, values: &[String]) -> EmitResult<()> {
        sub.write(w, &format!("__iter.yield({});\n", values.join(", ")))
    }

    fn emit_print(&self, sub: &mut Substrate, w: WriterId, args: &[String]) -> EmitResult<()> {
        sub.write(w, &format!("System.out.print({});\n", args.join(" + ")))
    }

    fn emit_call_stmt(&self, sub: &mut Substrate, w: WriterId, call: &str) -> EmitResult<()> {
        sub.write(w, &format!("{};\n", call))
    }

    fn emit_absurd(&self, sub: &mut Substrate, w: WriterId) -> EmitResult<()> {
        sub.write(w, "// unreachable: erased specification-only construct\n")
    }

    fn lit_bool(&self, b: bool) -> String {
        b.to_string()
    }

    fn lit_char(&self, c: char) -> String {
        format!("'{}'", c)
    }

    fn lit_int(&self, digits: &str) -> String {
        format!("new java.math.BigInteger(\"{}\")", digits)
    }

    fn lit_real(&self, digits: &str) -> String {
        format!("new java.math.BigDecimal(\"{}\")", digits)
    }

    fn lit_bitvector(&self, width: u32, value: u64) -> String {
        if width <= 32 {
            format!("{}", value as u32)
        } else {
            format!("{}L", value)
        }
    }

    fn lit_string(&self, s: &str) -> String {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
    }

    fn collection_display(&self, kind: CollectionKind, elems: &[String]) -> String {
        let ctor = match kind {
            CollectionKind::Set => "VeritySet.of",
            CollectionKind::Seq => "VeritySeq.of",
            CollectionKind::Multiset => "VerityMultiset.of",
        };
        format!("{}({})", ctor, elems.join(", "))
    }

    fn map_display(&self, entries: &[(String, String)]) -> String {
        let pairs: Vec<String> = entries.iter().map(|(k, v)| format!("java.util.Map.entry({}, {})", k, v)).collect();
        format!("VerityMap.of({})", pairs.join(", "))
    }

    fn index_select(&self, collection: &str, index: &str) -> String {
        format!("{}.get({})", collection, index)
    }

    fn index_update(&self, collection: &str, index: &str, value: &str) -> String {
        format!("{}.update({}, {})", collection, index, value)
    }

    fn seq_slice(&self, seq: &str, lo: Option<&str>, hi: Option<&str>) -> String {
        match (lo, hi) {
            (Some(lo), Some(hi)) => format!("{}.subsequence({}, {})", seq, lo, hi),
            (Some(lo), None) => format!("{}.drop({})", seq, lo),
            (None, Some(hi)) => format!("{}.take({})", seq, hi),
            (None, None) => seq.to_string(),
        }
    }

    fn array_select(&self, array: &str, indices: &[String]) -> String {
        let mut out = array.to_string();
        for idx in indices {
            out.push_str(&format!("[{}]", idx));
        }
        out
    }

    fn binary_op(&self, op: BinaryOp, ty: &Type, lhs: &str, rhs: &str) -> String {
        let is_bigint = matches!(ty, Type::Int);
        let is_bigdec = matches!(ty, Type::Real);
        match op {
            BinaryOp::Add if is_bigint || is_bigdec => format!("{}.add({})", lhs, rhs),
            BinaryOp::Sub if is_bigint || is_bigdec => format!("{}.subtract({})", lhs, rhs),
            BinaryOp::Mul if is_bigint || is_bigdec => format!("{}.multiply({})", lhs, rhs),
            BinaryOp::EuclideanDiv if is_bigint => format!("VerityRuntime.euclideanDiv({}, {})", lhs, rhs),
            BinaryOp::EuclideanMod if is_bigint => format!("VerityRuntime.euclideanMod({}, {})", lhs, rhs),
            BinaryOp::Eq if is_bigint || is_bigdec => format!("{}.equals({})", lhs, rhs),
            BinaryOp::Neq if is_bigint || is_bigdec => format!("!{}.equals({})", lhs, rhs),
            BinaryOp::Lt if is_bigint || is_bigdec => format!("({}.compareTo({}) < 0)", lhs, rhs),
            BinaryOp::Gt if is_bigint || is_bigdec => format!("({}.compareTo({}) > 0)", lhs, rhs),
            BinaryOp::Le if is_bigint || is_bigdec => format!("({}.compareTo({}) <= 0)", lhs, rhs),
            BinaryOp::Ge if is_bigint || is_bigdec => format!("({}.compareTo({}) >= 0)", lhs, rhs),
            BinaryOp::Add => format!("({} + {})", lhs, rhs),
            BinaryOp::Sub => format!("({} - {})", lhs, rhs),
            BinaryOp::Mul => format!("({} * {})", lhs, rhs),
            BinaryOp::EuclideanDiv => format!("VerityRuntime.euclideanDiv({}, {})", lhs, rhs),
            BinaryOp::EuclideanMod => format!("VerityRuntime.euclideanMod({}, {})", lhs, rhs),
            BinaryOp::Eq => format!("java.util.Objects.equals({}, {})", lhs, rhs),
            BinaryOp::Neq => format!("!java.util.Objects.equals({}, {})", lhs, rhs),
            BinaryOp::Lt => format!("({} < {})", lhs, rhs),
            BinaryOp::Gt => format!("({} > {})", lhs, rhs),
            BinaryOp::Le => format!("({} <= {})", lhs, rhs),
            BinaryOp::Ge => format!("({} >= {})", lhs, rhs),
            BinaryOp::And => format!("({} && {})", lhs, rhs),
            BinaryOp::Or => format!("({} || {})", lhs, rhs),
            BinaryOp::BitAnd => format!("({} & {})", lhs, rhs),
            BinaryOp::BitOr => format!("({} | {})", lhs, rhs),
            BinaryOp::BitXor => format!("({} ^ {})", lhs, rhs),
            BinaryOp::ShiftLeft => format!("({} << {})", lhs, rhs),
            BinaryOp::ShiftRight => format!("({} >>> {})", lhs, rhs),
            BinaryOp::RotateLeft => format!("VerityRuntime.rotateLeft({}, {})", lhs, rhs),
            BinaryOp::RotateRight => format!("VerityRuntime.rotateRight({}, {})", lhs, rhs),
            BinaryOp::SetUnion => format!("{}.union({})", lhs, rhs),
            BinaryOp::SetIntersect => format!("{}.intersect({})", lhs, rhs),
            BinaryOp::SetDifference => format!("{}.difference({})", lhs, rhs),
            BinaryOp::SeqConcat => format!("{}.concat({})", lhs, rhs),
            BinaryOp::In => format!("{}.contains({})", rhs, lhs),
            BinaryOp::NotIn => format!("!{}.contains({})", rhs, lhs),
        }
    }

    fn unary_op(&self, op: UnaryOp, operand: &str) -> String {
        match op {
            UnaryOp::Not => format!("!{}", operand),
            UnaryOp::Negate => format!("{}.negate()", operand),
            UnaryOp::SetCardinality => format!("{}.size()", operand),
            UnaryOp::SeqLength => format!("{}.length()", operand),
        }
    }

    fn convert(&self, expr: &str, _from: &Type, to: &Type) -> String {
        format!("(({}) {})", self.type_name(to), expr)
    }

    fn quantifier(&self, kind: QuantifierKind, bound: &[String], range: Option<&str>, body: &str) -> String {
        let method = match kind {
            QuantifierKind::Forall => "forall",
            QuantifierKind::Exists => "exists",
        };
        let range = range.unwrap_or("true");
        format!("VerityRuntime.{}(new String[]{{{}}}, () -> {}, () -> {})", method, bound.join(", "), range, body)
    }

    fn set_comprehension(&self, bound: &[String], range: &str, term: &str) -> String {
        format!("VerityRuntime.setComprehension(new String[]{{{}}}, () -> {}, () -> {})", bound.join(", "), range, term)
    }

    fn map_comprehension(&self, bound: &[String], range: &str, key: &str, value: &str) -> String {
        format!(
            "VerityRuntime.mapComprehension(new String[]{{{}}}, () -> {}, () -> {}, () -> {})",
            bound.join(", "),
            range,
            key,
            value
        )
    }

    fn lambda(&self, params: &[String], body: &str) -> String {
        format!("({}) -> {}", params.join(", "), body)
    }

    fn let_expr(&self, name: &str, value: &str, body: &str) -> String {
        format!("((java.util.function.Supplier<Object>) (() -> {{ var {} = {}; return {}; }})).get()", name, value, body)
    }

    fn tuple_type_name(&self, elem_types: &[String]) -> String {
        format!("Tuple{}<{}>", elem_types.len(), elem_types.join(", "))
    }

    fn format_lazy_formal(&self, name: &str, _ty: &Type) -> FormalText {
        format!("java.util.function.Supplier<Object> {}", name)
    }

    fn lazy_thunk(&self, value: &str, _ty: &Type) -> String {
        format!("(java.util.function.Supplier<Object>) (() -> {})", value)
    }

    fn match_expr(&self, scrutinee: &str, arms: &[(String, String)]) -> String {
        let cases: Vec<String> = arms
            .iter()
            .map(|(ctor, body)| format!("({} instanceof {} ? {} : ", scrutinee, ctor, body))
            .collect();
        format!("{}{}{}", cases.join(""), "throw new IllegalStateException()", ")".repeat(arms.len()))
    }

    fn apply(&self, callee: &str, args: &[String]) -> String {
        format!("{}({})", callee, args.join(", "))
    }

    fn field_access(&self, receiver: Option<&str>, is_static: bool, name: &str) -> String {
        match receiver {
            Some(r) => format!("{}.{}", r, name),
            None if is_static => name.to_string(),
            None => format!("this.{}", name),
        }
    }

    fn type_name(&self, ty: &Type) -> String {
        match ty {
            Type::Bool => "boolean".to_string(),
            Type::Char => "char".to_string(),
            Type::Int => "java.math.BigInteger".to_string(),
            Type::Real => "java.math.BigDecimal".to_string(),
            Type::Bitvector { width, .. } if *width <= 32 => "int".to_string(),
            Type::Bitvector { .. } => "long".to_string(),
            Type::Set(t) => format!("VeritySet<{}>", self.type_name(t)),
            Type::Seq(t) => format!("VeritySeq<{}>", self.type_name(t)),
            Type::Multiset(t) => format!("VerityMultiset<{}>", self.type_name(t)),
            Type::Map(k, v) => format!("VerityMap<{}, {}>", self.type_name(k), self.type_name(v)),
            Type::Array { elem, .. } => format!("{}[]", self.type_name(elem)),
            Type::UserDefined { .. } => "Object".to_string(),
            Type::Arrow { .. } => "java.util.function.Function".to_string(),
            Type::TypeParameter(_) => "Object".to_string(),
            Type::TypeProxy => "Object".to_string(),
        }
    }

    fn is_reserved(&self, ident: &str) -> bool {
        let set: HashSet<&str> = RESERVED.iter().copied().collect();
        set.contains(ident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn class_block_uses_k_and_r_brace_style() {
        let backend = JavaBackend;
        let mut sub = Substrate::new("    ");
        let root = sub.new_file("Foo.java");
        let class = backend.open_class(&mut sub, root, "Foo", &[]).unwrap();
        sub.write(class, "int x;\n").unwrap();
        backend.close_scope(&mut sub, class);
        let files = sub.flush_to_strings();
        assert_eq!(files[0].1, "public class Foo {\n    int x;\n}\n");
    }

    #[test]
    fn reserved_identifier_gets_disambiguated() {
        let backend = JavaBackend;
        assert_eq!(backend.sanitize_ident("class"), "class_");
        assert_eq!(backend.sanitize_ident("public"), "public_");
        assert_eq!(backend.sanitize_ident("total"), "total");
    }

    #[test]
    fn int_literal_constructs_a_big_integer() {
        let backend = JavaBackend;
        assert_eq!(backend.lit_int("42"), "new java.math.BigInteger(\"42\")");
    }

    #[test]
    fn euclidean_division_goes_through_the_runtime_helper() {
        let backend = JavaBackend;
        let rendered = backend.binary_op(BinaryOp::EuclideanDiv, &Type::Int, "a", "b");
        assert_eq!(rendered, "VerityRuntime.euclideanDiv(a, b)");
    }

    #[test]
    fn capabilities_report_erased_generics() {
        let backend = JavaBackend;
        assert!(backend.capabilities().erased_generics);
        assert!(backend.capabilities().labeled_loops);
    }
}
