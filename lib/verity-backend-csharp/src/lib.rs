//! The C-family managed-runtime backend: emits C# source. Generics are
//! reified (the CLR keeps runtime type handles), so the driver's type
//! descriptors are threaded through as explicit generic arguments rather
//! than discarded.

use std::collections::HashSet;

use verity_core::{Backend, BraceStyle, Capabilities, FormalText, StringRepr, Target};
use verity_emit::{EmitResult, Substrate, WriterId};
use verity_rir::{BinaryOp, CollectionKind, QuantifierKind, Type, UnaryOp};

const RUNTIME_SOURCE: &str = include_str!("../runtime/VerityRuntime.cs");

const RESERVED: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while", "var", "record", "yield",
];

pub struct CSharpBackend;

impl Backend for CSharpBackend {
    fn target(&self) -> Target {
        Target::CSharp
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            erased_generics: false,
            native_int_widths: &[8, 16, 32, 64],
            trait_typed_collections: true,
            native_codatatypes: false,
            labeled_loops: false,
            max_tuple_arity: Some(7),
            string_repr: StringRepr::Object,
        }
    }

    fn runtime_resource(&self) -> (&'static str, &'static str) {
        ("VerityRuntime.cs", RUNTIME_SOURCE)
    }

    fn open_module(&self, sub: &mut Substrate, parent: WriterId, name: &str) -> EmitResult<WriterId> {
        sub.new_block(parent, &format!("namespace {} {{", name), "}", BraceStyle::NewLine, BraceStyle::NewLine)
    }

    fn open_class(&self, sub: &mut Substrate, parent: WriterId, name: &str, implements: &[String]) -> EmitResult<WriterId> {
        let header = if implements.is_empty() {
            format!("public class {} {{", name)
        } else {
            format!("public class {} : {} {{", name, implements.join(", "))
        };
        sub.new_block(parent, &header, "}", BraceStyle::NewLine, BraceStyle::NewLine)
    }

    fn open_member(&self, sub: &mut Substrate, parent: WriterId, signature: &str) -> EmitResult<WriterId> {
        sub.new_block(parent, &format!("{} {{", signature), "}", BraceStyle::NewLine, BraceStyle::NewLine)
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
            (_, true) => "public const",
            (true, false) => "public static",
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
        sub.new_block(parent, &format!("public abstract class {} {{", name), "}", BraceStyle::NewLine, BraceStyle::NewLine)
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
        let header = format!("public sealed class {} : {} {{", ctor_name, base_name);
        let class = sub.new_block(parent, &header, "}", BraceStyle::NewLine, BraceStyle::NewLine)?;
        for formal in formals {
            sub.write(class, &format!("public readonly {};\n", formal))?;
        }
        let ctor_header = format!("public {}({}) {{", ctor_name, formals.join(", "));
        let ctor_body = sub.new_block(class, &ctor_header, "}", BraceStyle::NewLine, BraceStyle::NewLine)?;
        for (name, _) in fields {
            sub.write(ctor_body, &format!("this.{} = {};\n", name, name))?;
        }
        sub.write(class, &format!("public bool Is_{}() {{ return true; }}\n", ctor_name))?;
        for (name, ty) in fields {
            let ret = self.type_name(ty);
            if co_inductive {
                sub.write(class, &format!("public {} Dtor_{}() {{ return this.{}(); }}\n", ret, name, name))?;
            } else {
                sub.write(class, &format!("public {} Dtor_{}() {{ return this.{}; }}\n", ret, name, name))?;
            }
        }
        Ok(class)
    }

    fn declare_newtype(&self, sub: &mut Substrate, parent: WriterId, name: &str, base: &Type, default_value: &str) -> EmitResult<()> {
        sub.write(parent, &format!("public static readonly {} Default{} = {};\n", self.type_name(base), name, default_value))
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
            sub.write(w, &format!("{} = __t.Item{};\n", name, i + 1))?;
        }
        Ok(())
    }

    fn emit_if(&self, sub: &mut Substrate, w: WriterId, cond: &str) -> EmitResult<(WriterId, WriterId)> {
        let then_w = sub.new_block(w, &format!("if ({}) {{", cond), "}", BraceStyle::NewLine, BraceStyle::NewLine)?;
        let else_w = sub.new_block(w, "else {", "}", BraceStyle::NewLine, BraceStyle::NewLine)?;
        Ok((then_w, else_w))
    }

    fn emit_while(&self, sub: &mut Substrate, w: WriterId, cond: &str) -> EmitResult<WriterId> {
        sub.new_block(w, &format!("while ({}) {{", cond), "}", BraceStyle::NewLine, BraceStyle::NewLine)
    }

    fn emit_for_range(&self, sub: &mut Substrate, w: WriterId, var: &str, lo: &str, hi: &str) -> EmitResult<WriterId> {
        let header = format!(
            "for (System.Numerics.BigInteger {v} = {lo}; {v} < {hi}; {v} += 1) {{",
            v = var,
            lo = lo,
            hi = hi
        );
        sub.new_block(w, &header, "}", BraceStyle::NewLine, BraceStyle::NewLine)
    }

    fn emit_for_each(&self, sub: &mut Substrate, w: WriterId, var: &str, collection: &str) -> EmitResult<WriterId> {
        sub.new_block(w, &format!("foreach (var {} in {}) {{", var, collection), "}", BraceStyle::NewLine, BraceStyle::NewLine)
    }

    fn emit_loop(&self, sub: &mut Substrate, w: WriterId, label: Option<&str>) -> EmitResult<WriterId> {
        // C# has no labeled break/continue; the driver emulates with goto,
        // so a loop label becomes a goto target placed just after the loop.
        let header = "while (true) {".to_string();
        let body = sub.new_block(w, &header, "}", BraceStyle::NewLine, BraceStyle::NewLine)?;
        if let Some(l) = label {
            sub.write(w, &format!("{}:;\n", l))?;
        }
        Ok(body)
    }

    fn emit_break(&self, sub: &mut Substrate, w: WriterId, label: Option<&str>) -> EmitResult<()> {
        match label {
            Some(l) => sub.write(w, &format!("goto {};\n", l)),
            None => sub.write(w, "break;\n"),
        }
    }

    fn emit_return(&self, sub: &mut Substrate, w: WriterId, values: &[String]) -> EmitResult<()> {
        match values.len() {
            0 => sub.write(w, "return;\n"),
            1 => sub.write(w, &format!("return {};\n", values[0])),
            _ => sub.write(w, &format!("return ({});\n", values.join(", "))),
        }
    }

    fn emit_yield(&self, sub: &mut Substrate, w: WriterId, values: &[String]) -> EmitResult<()> {
        match values.len() {
            1 => sub.write(w, &format!("yield return {};\n", values[0])),
            _ => sub.write(w, &format!("yield return ({});\n", values.join(", "))),
        }
    }

    fn emit_print(&self, sub: &mut Substrate, w: WriterId, args: &[String]) -> EmitResult<()> {
        sub.write(w, &format!("System.Console.Write({});\n", args.join(" + ")))
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
        format!("System.Numerics.BigInteger.Parse(\"{}\")", digits)
    }

    fn lit_real(&self, digits: &str) -> String {
        format!("VerityRuntime.ParseDecimal(\"{}\")", digits)
    }

    fn lit_bitvector(&self, width: u32, value: u64) -> String {
        if width <= 32 {
            format!("{}", value as u32)
        } else {
            format!("{}UL", value)
        }
    }

    fn lit_string(&self, s: &str) -> String {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
    }

    fn collection_display(&self, kind: CollectionKind, elems: &[String]) -> String {
        let ctor = match kind {
            CollectionKind::Set => "VeritySet.Of",
            CollectionKind::Seq => "VeritySeq.Of",
            CollectionKind::Multiset => "VerityMultiset.Of",
        };
        format!("{}({})", ctor, elems.join(", "))
    }

    fn map_display(&self, entries: &[(String, String)]) -> String {
        let pairs: Vec<String> = entries.iter().map(|(k, v)| format!("({}, {})", k, v)).collect();
        format!("VerityMap.Of({})", pairs.join(", "))
    }

    fn index_select(&self, collection: &str, index: &str) -> String {
        format!("{}[{}]", collection, index)
    }

    fn index_update(&self, collection: &str, index: &str, value: &str) -> String {
        format!("{}.Update({}, {})", collection, index, value)
    }

    fn seq_slice(&self, seq: &str, lo: Option<&str>, hi: Option<&str>) -> String {
        match (lo, hi) {
            (Some(lo), Some(hi)) => format!("{}.Subsequence({}, {})", seq, lo, hi),
            (Some(lo), None) => format!("{}.Drop({})", seq, lo),
            (None, Some(hi)) => format!("{}.Take({})", seq, hi),
            (None, None) => seq.to_string(),
        }
    }

    fn array_select(&self, array: &str, indices: &[String]) -> String {
        format!("{}[{}]", array, indices.join(", "))
    }

    fn binary_op(&self, op: BinaryOp, ty: &Type, lhs: &str, rhs: &str) -> String {
        let is_bignum = matches!(ty, Type::Int | Type::Real);
        match op {
            BinaryOp::Add => format!("({} + {})", lhs, rhs),
            BinaryOp::Sub => format!("({} - {})", lhs, rhs),
            BinaryOp::Mul => format!("({} * {})", lhs, rhs),
            BinaryOp::EuclideanDiv => format!("VerityRuntime.EuclideanDiv({}, {})", lhs, rhs),
            BinaryOp::EuclideanMod => format!("VerityRuntime.EuclideanMod({}, {})", lhs, rhs),
            BinaryOp::Eq if is_bignum => format!("{}.Equals({})", lhs, rhs),
            BinaryOp::Eq => format!("object.Equals({}, {})", lhs, rhs),
            BinaryOp::Neq if is_bignum => format!("!{}.Equals({})", lhs, rhs),
            BinaryOp::Neq => format!("!object.Equals({}, {})", lhs, rhs),
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
            BinaryOp::ShiftRight => format!("((int)((uint){} >> {}))", lhs, rhs),
            BinaryOp::RotateLeft => format!("VerityRuntime.RotateLeft({}, {})", lhs, rhs),
            BinaryOp::RotateRight => format!("VerityRuntime.RotateRight({}, {})", lhs, rhs),
            BinaryOp::SetUnion => format!("{}.Union({})", lhs, rhs),
            BinaryOp::SetIntersect => format!("{}.Intersect({})", lhs, rhs),
            BinaryOp::SetDifference => format!("{}.Difference({})", lhs, rhs),
            BinaryOp::SeqConcat => format!("{}.Concat({})", lhs, rhs),
            BinaryOp::In => format!("{}.Contains({})", rhs, lhs),
            BinaryOp::NotIn => format!("!{}.Contains({})", rhs, lhs),
        }
    }

    fn unary_op(&self, op: UnaryOp, operand: &str) -> String {
        match op {
            UnaryOp::Not => format!("!{}", operand),
            UnaryOp::Negate => format!("(-{})", operand),
            UnaryOp::SetCardinality => format!("{}.Count", operand),
            UnaryOp::SeqLength => format!("{}.Length", operand),
        }
    }

    fn convert(&self, expr: &str, _from: &Type, to: &Type) -> String {
        format!("(({}) {})", self.type_name(to), expr)
    }

    fn quantifier(&self, kind: QuantifierKind, bound: &[String], range: Option<&str>, body: &str) -> String {
        let method = match kind {
            QuantifierKind::Forall => "Forall",
            QuantifierKind::Exists => "Exists",
        };
        let range = range.unwrap_or("true");
        format!("VerityRuntime.{}(new[] {{ {} }}, () => {}, () => {})", method, bound.join(", "), range, body)
    }

    fn set_comprehension(&self, bound: &[String], range: &str, term: &str) -> String {
        format!("VerityRuntime.SetComprehension(new[] {{ {} }}, () => {}, () => {})", bound.join(", "), range, term)
    }

    fn map_comprehension(&self, bound: &[String], range: &str, key: &str, value: &str) -> String {
        format!(
            "VerityRuntime.MapComprehension(new[] {{ {} }}, () => {}, () => {}, () => {})",
            bound.join(", "),
            range,
            key,
            value
        )
    }

    fn lambda(&self, params: &[String], body: &str) -> String {
        format!("({}) => {}", params.join(", "), body)
    }

    fn let_expr(&self, name: &str, value: &str, body: &str) -> String {
        format!("(new System.Func<object>(() => {{ var {} = {}; return {}; }}))()", name, value, body)
    }

    fn format_lazy_formal(&self, name: &str, ty: &Type) -> FormalText {
        format!("System.Func<{}> {}", self.type_name(ty), name)
    }

    fn lazy_thunk(&self, value: &str, ty: &Type) -> String {
        format!("new System.Func<{}>(() => {})", self.type_name(ty), value)
    }

    fn match_expr(&self, scrutinee: &str, arms: &[(String, String)]) -> String {
        let cases: Vec<String> = arms
            .iter()
            .map(|(ctor, body)| format!("{} is {} ? {} : ", scrutinee, ctor, body))
            .collect();
        format!("{}{}", cases.join(""), "throw new System.InvalidOperationException()")
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
            Type::Bool => "bool".to_string(),
            Type::Char => "char".to_string(),
            Type::Int => "System.Numerics.BigInteger".to_string(),
            Type::Real => "VerityRuntime.VDecimal".to_string(),
            Type::Bitvector { width, .. } if *width <= 32 => "uint".to_string(),
            Type::Bitvector { .. } => "ulong".to_string(),
            Type::Set(t) => format!("VeritySet<{}>", self.type_name(t)),
            Type::Seq(t) => format!("VeritySeq<{}>", self.type_name(t)),
            Type::Multiset(t) => format!("VerityMultiset<{}>", self.type_name(t)),
            Type::Map(k, v) => format!("VerityMap<{}, {}>", self.type_name(k), self.type_name(v)),
            Type::Array { elem, .. } => format!("{}[]", self.type_name(elem)),
            Type::UserDefined { .. } => "object".to_string(),
            Type::Arrow { .. } => "System.Delegate".to_string(),
            Type::TypeParameter(name) => name.clone(),
            Type::TypeProxy => "object".to_string(),
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
    fn namespace_block_opens_on_its_own_paragraph() {
        let backend = CSharpBackend;
        let mut sub = Substrate::new("    ");
        let root = sub.new_file("Foo.cs");
        let ns = backend.open_module(&mut sub, root, "Foo").unwrap();
        sub.write(ns, "// body\n").unwrap();
        backend.close_scope(&mut sub, ns);
        let files = sub.flush_to_strings();
        assert_eq!(files[0].1, "\nnamespace Foo {\n    // body\n}\n");
    }

    #[test]
    fn labeled_loop_capability_is_false_and_emulated_with_goto() {
        let backend = CSharpBackend;
        assert!(!backend.capabilities().labeled_loops);
        let mut sub = Substrate::new("  ");
        let root = sub.new_file("out.cs");
        let body = backend.emit_loop(&mut sub, root, Some("loop0")).unwrap();
        sub.write(body, "step();\n").unwrap();
        backend.emit_break(&mut sub, body, Some("loop0")).unwrap();
        let files = sub.flush_to_strings();
        assert!(files[0].1.contains("goto loop0;"));
        assert!(files[0].1.contains("loop0:;"));
    }

    #[test]
    fn reified_generics_keep_the_type_parameter_name() {
        let backend = CSharpBackend;
        assert!(!backend.capabilities().erased_generics);
        assert_eq!(backend.type_name(&Type::TypeParameter("T".to_string())), "T");
    }

    #[test]
    fn max_tuple_arity_matches_value_tuple_direct_arity() {
        let backend = CSharpBackend;
        assert_eq!(backend.capabilities().max_tuple_arity, Some(7));
    }
}
