//! The GC systems-language backend: emits Go source. Go keeps concrete type
//! arguments at each instantiation site rather than erasing them the way the
//! JVM does, so `Capabilities::erased_generics` is false here, matching the
//! C# backend's reasoning rather than Java's.

use std::collections::HashSet;

use verity_core::{Backend, BraceStyle, Capabilities, FormalText, StringRepr, Target};
use verity_emit::{EmitResult, Substrate, WriterId};
use verity_rir::{BinaryOp, CollectionKind, QuantifierKind, Type, UnaryOp};

const RUNTIME_SOURCE: &str = include_str!("../runtime/runtime.go");

const RESERVED: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range",
    "return", "select", "struct", "switch", "type", "var", "true", "false", "nil", "iota",
];

pub struct GoBackend;

impl Backend for GoBackend {
    fn target(&self) -> Target {
        Target::Go
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            erased_generics: false,
            native_int_widths: &[8, 16, 32, 64],
            trait_typed_collections: true,
            native_codatatypes: false,
            labeled_loops: true,
            max_tuple_arity: None,
            string_repr: StringRepr::Object,
        }
    }

    fn runtime_resource(&self) -> (&'static str, &'static str) {
        ("runtime.go", RUNTIME_SOURCE)
    }

    fn open_module(&self, sub: &mut Substrate, parent: WriterId, name: &str) -> EmitResult<WriterId> {
        sub.write(parent, &format!("package {}\n\n", name.to_lowercase()))?;
        Ok(parent)
    }

    fn open_class(&self, sub: &mut Substrate, parent: WriterId, name: &str, implements: &[String]) -> EmitResult<WriterId> {
        let header = format!("type {} struct {{", name);
        let decl = sub.new_block(parent, &header, "}", BraceStyle::SameLine, BraceStyle::NewLine)?;
        for iface in implements {
            sub.write(parent, &format!("\nvar _ {} = (*{})(nil)\n", iface, name))?;
        }
        Ok(decl)
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
        if is_static {
            let decl_line = sub.fork(parent)?;
            let keyword = if is_const { "const" } else { "var" };
            let init_fork = if has_initializer {
                sub.write(decl_line, &format!("{} {} {} = ", keyword, name, self.type_name(ty)))?;
                let f = sub.fork(decl_line)?;
                sub.write(decl_line, "\n")?;
                Some(f)
            } else {
                sub.write(decl_line, &format!("{} {} {}\n", keyword, name, self.type_name(ty)))?;
                None
            };
            return Ok((decl_line, init_fork));
        }
        let decl_line = sub.fork(parent)?;
        sub.write(decl_line, &format!("{} {}\n", name, self.type_name(ty)))?;
        Ok((decl_line, None))
    }

    fn declare_local(&self, sub: &mut Substrate, parent: WriterId, name: &str, ty: &Type, init: Option<&str>) -> EmitResult<()> {
        match init {
            Some(rhs) => sub.write(parent, &format!("var {} {} = {}\n", name, self.type_name(ty), rhs)),
            None => sub.write(parent, &format!("var {} {}\n", name, self.type_name(ty))),
        }
    }

    fn format_formal(&self, name: &str, ty: &Type) -> FormalText {
        format!("{} {}", name, self.type_name(ty))
    }

    fn declare_datatype_base(&self, sub: &mut Substrate, parent: WriterId, name: &str) -> EmitResult<WriterId> {
        sub.write(parent, &format!("type {} interface {{ is{}() }}\n", name, name))?;
        Ok(parent)
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
        let header = format!("type {} struct {{", ctor_name);
        let class = sub.new_block(parent, &header, "}", BraceStyle::SameLine, BraceStyle::NewLine)?;
        for formal in formals {
            sub.write(class, &format!("{}\n", formal))?;
        }
        sub.write(
            parent,
            &format!("\nfunc (v {}) is{}() {{}}\n", ctor_name, base_name),
        )?;
        sub.write(parent, &format!("func (v {}) Is_{}() bool {{ return true }}\n", ctor_name, ctor_name))?;
        for (name, ty) in fields {
            let ret = self.type_name(ty);
            if co_inductive {
                sub.write(parent, &format!("func (v {}) Dtor_{}() {} {{ return v.{}() }}\n", ctor_name, name, ret, name))?;
            } else {
                sub.write(parent, &format!("func (v {}) Dtor_{}() {} {{ return v.{} }}\n", ctor_name, name, ret, name))?;
            }
        }
        Ok(class)
    }

    fn declare_newtype(&self, sub: &mut Substrate, parent: WriterId, name: &str, base: &Type, default_value: &str) -> EmitResult<()> {
        sub.write(parent, &format!("var Default{} {} = {}\n", name, self.type_name(base), default_value))
    }

    fn declare_subset_type(&self, sub: &mut Substrate, parent: WriterId, name: &str, base: &Type, default_value: &str) -> EmitResult<()> {
        self.declare_newtype(sub, parent, name, base, default_value)
    }

    fn emit_assign(&self, sub: &mut Substrate, w: WriterId, lhs: &str, rhs: &str) -> EmitResult<()> {
        sub.write(w, &format!("{} = {}\n", lhs, rhs))
    }

    fn emit_multi_assign(&self, sub: &mut Substrate, w: WriterId, lhs: &[String], call: &str) -> EmitResult<()> {
        sub.write(w, &format!("{} = {}\n", lhs.join(", "), call))
    }

    fn emit_if(&self, sub: &mut Substrate, w: WriterId, cond: &str) -> EmitResult<(WriterId, WriterId)> {
        let then_w = sub.new_block(w, &format!("if {} {{", cond), "}", BraceStyle::SameLine, BraceStyle::NewLine)?;
        let else_w = sub.new_block(w, "else {", "}", BraceStyle::SameLine, BraceStyle::NewLine)?;
        Ok((then_w, else_w))
    }

    fn emit_while(&self, sub: &mut Substrate, w: WriterId, cond: &str) -> EmitResult<WriterId> {
        sub.new_block(w, &format!("for {} {{", cond), "}", BraceStyle::SameLine, BraceStyle::NewLine)
    }

    fn emit_for_range(&self, sub: &mut Substrate, w: WriterId, var: &str, lo: &str, hi: &str) -> EmitResult<WriterId> {
        let header = format!("for {v} := {lo}; {v} < {hi}; {v}++ {{", v = var, lo = lo, hi = hi);
        sub.new_block(w, &header, "}", BraceStyle::SameLine, BraceStyle::NewLine)
    }

    fn emit_for_each(&self, sub: &mut Substrate, w: WriterId, var: &str, collection: &str) -> EmitResult<WriterId> {
        sub.new_block(w, &format!("for _, {} := range {} {{", var, collection), "}", BraceStyle::SameLine, BraceStyle::NewLine)
    }

    fn emit_loop(&self, sub: &mut Substrate, w: WriterId, label: Option<&str>) -> EmitResult<WriterId> {
        match label {
            Some(l) => sub.write(w, &format!("{}:\n", l))?,
            None => {}
        }
        sub.new_block(w, "for {", "}", BraceStyle::SameLine, BraceStyle::NewLine)
    }

    fn emit_break(&self, sub: &mut Substrate, w: WriterId, label: Option<&str>) -> EmitResult<()> {
        match label {
            Some(l) => sub.write(w, &format!("break {}\n", l)),
            None => sub.write(w, "break\n"),
        }
    }

    fn emit_return(&self, sub: &mut Substrate, w: WriterId, values: &[String]) -> EmitResult<()> {
        if values.is_empty() {
            sub.write(w, "return\n")
        } else {
            sub.write(w, &format!("return {}\n", values.join(", ")))
        }
    }

    fn emit_yield(&self, sub: &mut Substrate, w: WriterId, values: &[String]) -> EmitResult<()> {
        sub.write(w, &format!("__yield({})\n", values.join(", ")))
    }

    fn emit_print(&self, sub: &mut Substrate, w: WriterId, args: &[String]) -> EmitResult<()> {
        sub.write(w, &format!("fmt.Print({})\n", args.join(", ")))
    }

    fn emit_call_stmt(&self, sub: &mut Substrate, w: WriterId, call: &str) -> EmitResult<()> {
        sub.write(w, &format!("{}\n", call))
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
        format!("verityruntime.NewBigInt(\"{}\")", digits)
    }

    fn lit_real(&self, digits: &str) -> String {
        format!("verityruntime.NewBigDecimal(\"{}\")", digits)
    }

    fn lit_bitvector(&self, width: u32, value: u64) -> String {
        if width <= 32 {
            format!("uint32({})", value as u32)
        } else {
            format!("uint64({})", value)
        }
    }

    fn lit_string(&self, s: &str) -> String {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
    }

    fn collection_display(&self, kind: CollectionKind, elems: &[String]) -> String {
        let ctor = match kind {
            CollectionKind::Set => "verityruntime.SetOf",
            CollectionKind::Seq => "verityruntime.SeqOf",
            CollectionKind::Multiset => "verityruntime.MultisetOf",
        };
        format!("{}({})", ctor, elems.join(", "))
    }

    fn map_display(&self, entries: &[(String, String)]) -> String {
        let pairs: Vec<String> = entries.iter().map(|(k, v)| format!("{}, {}", k, v)).collect();
        format!("verityruntime.MapOf({})", pairs.join(", "))
    }

    fn index_select(&self, collection: &str, index: &str) -> String {
        format!("{}.Get({})", collection, index)
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
        let mut out = array.to_string();
        for idx in indices {
            out.push_str(&format!("[{}]", idx));
        }
        out
    }

    fn binary_op(&self, op: BinaryOp, ty: &Type, lhs: &str, rhs: &str) -> String {
        let is_bignum = matches!(ty, Type::Int | Type::Real);
        match op {
            BinaryOp::Add if is_bignum => format!("{}.Add({})", lhs, rhs),
            BinaryOp::Sub if is_bignum => format!("{}.Sub({})", lhs, rhs),
            BinaryOp::Mul if is_bignum => format!("{}.Mul({})", lhs, rhs),
            BinaryOp::EuclideanDiv => format!("verityruntime.EuclideanDiv({}, {})", lhs, rhs),
            BinaryOp::EuclideanMod => format!("verityruntime.EuclideanMod({}, {})", lhs, rhs),
            BinaryOp::Eq if is_bignum => format!("{}.Cmp({}) == 0", lhs, rhs),
            BinaryOp::Neq if is_bignum => format!("{}.Cmp({}) != 0", lhs, rhs),
            BinaryOp::Add => format!("({} + {})", lhs, rhs),
            BinaryOp::Sub => format!("({} - {})", lhs, rhs),
            BinaryOp::Mul => format!("({} * {})", lhs, rhs),
            BinaryOp::Eq => format!("({} == {})", lhs, rhs),
            BinaryOp::Neq => format!("({} != {})", lhs, rhs),
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
            BinaryOp::ShiftRight => format!("({} >> {})", lhs, rhs),
            BinaryOp::RotateLeft => format!("bits.RotateLeft32({}, {})", lhs, rhs),
            BinaryOp::RotateRight => format!("bits.RotateLeft32({}, -{})", lhs, rhs),
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
            UnaryOp::Negate => format!("{}.Neg()", operand),
            UnaryOp::SetCardinality => format!("{}.Len()", operand),
            UnaryOp::SeqLength => format!("{}.Len()", operand),
        }
    }

    fn convert(&self, expr: &str, _from: &Type, to: &Type) -> String {
        format!("{}({})", self.type_name(to), expr)
    }

    fn quantifier(&self, kind: QuantifierKind, bound: &[String], range: Option<&str>, body: &str) -> String {
        let method = match kind {
            QuantifierKind::Forall => "Forall",
            QuantifierKind::Exists => "Exists",
        };
        let range = range.unwrap_or("true");
        format!(
            "verityruntime.{}([]string{{{}}}, func() bool {{ return {} }}, func() bool {{ return {} }})",
            method,
            bound.join(", "),
            range,
            body
        )
    }

    fn set_comprehension(&self, bound: &[String], range: &str, term: &str) -> String {
        format!(
            "verityruntime.SetComprehension([]string{{{}}}, func() bool {{ return {} }}, func() interface{{}} {{ return {} }})",
            bound.join(", "),
            range,
            term
        )
    }

    fn map_comprehension(&self, bound: &[String], range: &str, key: &str, value: &str) -> String {
        format!(
            "verityruntime.MapComprehension([]string{{{}}}, func() bool {{ return {} }}, func() interface{{}} {{ return {} }}, func() interface{{}} {{ return {} }})",
            bound.join(", "),
            range,
            key,
            value
        )
    }

    fn lambda(&self, params: &[String], body: &str) -> String {
        format!("func({}) interface{{}} {{ return {} }}", params.join(", "), body)
    }

    fn let_expr(&self, name: &str, value: &str, body: &str) -> String {
        format!("func() interface{{}} {{ {} := {}; return {} }}()", name, value, body)
    }

    fn if_expr(&self, cond: &str, then_branch: &str, else_branch: &str) -> String {
        format!(
            "func() interface{{}} {{ if {} {{ return {} }}; return {} }}()",
            cond, then_branch, else_branch
        )
    }

    fn format_lazy_formal(&self, name: &str, ty: &Type) -> FormalText {
        format!("{} func() {}", name, self.type_name(ty))
    }

    fn lazy_thunk(&self, value: &str, ty: &Type) -> String {
        format!("func() {} {{ return {} }}", self.type_name(ty), value)
    }

    fn match_expr(&self, scrutinee: &str, arms: &[(String, String)]) -> String {
        let mut out = String::from("func() interface{} {\n");
        for (ctor, body) in arms {
            out.push_str(&format!("if _, ok := {}.({}); ok {{ return {} }}\n", scrutinee, ctor, body));
        }
        out.push_str("panic(\"no matching variant\")\n}()");
        out
    }

    fn apply(&self, callee: &str, args: &[String]) -> String {
        format!("{}({})", callee, args.join(", "))
    }

    fn field_access(&self, receiver: Option<&str>, _is_static: bool, name: &str) -> String {
        match receiver {
            Some(r) => format!("{}.{}", r, name),
            None => name.to_string(),
        }
    }

    fn type_name(&self, ty: &Type) -> String {
        match ty {
            Type::Bool => "bool".to_string(),
            Type::Char => "rune".to_string(),
            Type::Int => "verityruntime.BigInt".to_string(),
            Type::Real => "verityruntime.BigDecimal".to_string(),
            Type::Bitvector { width, .. } if *width <= 32 => "uint32".to_string(),
            Type::Bitvector { .. } => "uint64".to_string(),
            Type::Set(t) => format!("verityruntime.Set[{}]", self.type_name(t)),
            Type::Seq(t) => format!("verityruntime.Seq[{}]", self.type_name(t)),
            Type::Multiset(t) => format!("verityruntime.Multiset[{}]", self.type_name(t)),
            Type::Map(k, v) => format!("verityruntime.Map[{}, {}]", self.type_name(k), self.type_name(v)),
            Type::Array { elem, .. } => format!("[]{}", self.type_name(elem)),
            Type::UserDefined { .. } => "interface{}".to_string(),
            Type::Arrow { .. } => "func(...interface{}) interface{}".to_string(),
            Type::TypeParameter(name) => name.clone(),
            Type::TypeProxy => "interface{}".to_string(),
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
    fn struct_block_uses_k_and_r_brace_style() {
        let backend = GoBackend;
        let mut sub = Substrate::new("\t");
        let root = sub.new_file("foo.go");
        let class = backend.open_class(&mut sub, root, "Foo", &[]).unwrap();
        sub.write(class, "X int\n").unwrap();
        backend.close_scope(&mut sub, class);
        let files = sub.flush_to_strings();
        assert_eq!(files[0].1, "type Foo struct {\n\tX int\n}\n");
    }

    #[test]
    fn reserved_identifier_gets_disambiguated() {
        let backend = GoBackend;
        assert_eq!(backend.sanitize_ident("type"), "type_");
        assert_eq!(backend.sanitize_ident("total"), "total");
    }

    #[test]
    fn capabilities_report_native_generics_not_erased() {
        let backend = GoBackend;
        assert!(!backend.capabilities().erased_generics);
        assert!(backend.capabilities().labeled_loops);
    }

    #[test]
    fn euclidean_division_goes_through_the_runtime_helper() {
        let backend = GoBackend;
        let rendered = backend.binary_op(BinaryOp::EuclideanDiv, &Type::Int, "a", "b");
        assert_eq!(rendered, "verityruntime.EuclideanDiv(a, b)");
    }
}
