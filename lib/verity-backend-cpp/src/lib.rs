//! The C++ dialect backend. Templates are monomorphized at each
//! instantiation site rather than erased, so `erased_generics` is false;
//! and C++ has no labeled break/continue, so (like the C# backend)
//! `emit_loop`/`emit_break` fall back to `goto`.

use std::collections::HashSet;

use verity_core::{Backend, BraceStyle, Capabilities, FormalText, StringRepr, Target};
use verity_emit::{EmitResult, Substrate, WriterId};
use verity_rir::{BinaryOp, CollectionKind, QuantifierKind, Type, UnaryOp};

const RUNTIME_SOURCE: &str = include_str!("../runtime/verity_runtime.hpp");

const RESERVED: &[&str] = &[
    "alignas", "alignof", "and", "asm", "auto", "bool", "break", "case", "catch", "char",
    "class", "concept", "const", "consteval", "constexpr", "continue", "decltype", "default",
    "delete", "do", "double", "else", "enum", "explicit", "export", "extern", "false", "float",
    "for", "friend", "goto", "if", "inline", "int", "long", "mutable", "namespace", "new",
    "noexcept", "nullptr", "operator", "private", "protected", "public", "register", "requires",
    "return", "short", "signed", "sizeof", "static", "struct", "switch", "template", "this",
    "throw", "true", "try", "typedef", "typeid", "typename", "union", "unsigned", "using",
    "virtual", "void", "volatile", "while",
];

pub struct CppBackend;

impl Backend for CppBackend {
    fn target(&self) -> Target {
        Target::Cpp
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            erased_generics: false,
            native_int_widths: &[8, 16, 32, 64],
            trait_typed_collections: false,
            native_codatatypes: false,
            labeled_loops: false,
            max_tuple_arity: None,
            string_repr: StringRepr::Object,
        }
    }

    fn runtime_resource(&self) -> (&'static str, &'static str) {
        ("verity_runtime.hpp", RUNTIME_SOURCE)
    }

    fn open_module(&self, sub: &mut Substrate, parent: WriterId, name: &str) -> EmitResult<WriterId> {
        sub.write(parent, "#include \"verity_runtime.hpp\"\n\n")?;
        sub.new_block(parent, &format!("namespace {} {{", name), "}", BraceStyle::SameLine, BraceStyle::NewLine)
    }

    fn open_class(&self, sub: &mut Substrate, parent: WriterId, name: &str, implements: &[String]) -> EmitResult<WriterId> {
        let header = if implements.is_empty() {
            format!("class {} {{", name)
        } else {
            format!("class {} : public {} {{", name, implements.join(", public "))
        };
        let class = sub.new_block(parent, &header, "};", BraceStyle::SameLine, BraceStyle::NewLine)?;
        sub.write(class, "public:\n")?;
        Ok(class)
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
        let mut modifiers = String::new();
        if is_static {
            modifiers.push_str("static ");
        }
        if is_const {
            modifiers.push_str("const ");
        }
        let decl_line = sub.fork(parent)?;
        let init_fork = if has_initializer {
            sub.write(decl_line, &format!("{}{} {} = ", modifiers, self.type_name(ty), name))?;
            let f = sub.fork(decl_line)?;
            sub.write(decl_line, ";\n")?;
            Some(f)
        } else {
            sub.write(decl_line, &format!("{}{} {};\n", modifiers, self.type_name(ty), name))?;
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
        let header = format!("class {} {{", name);
        let class = sub.new_block(parent, &header, "};", BraceStyle::SameLine, BraceStyle::NewLine)?;
        sub.write(class, &format!("public:\nvirtual ~{}() = default;\n", name))?;
        Ok(class)
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
        let header = format!("class {} : public {} {{", ctor_name, base_name);
        let class = sub.new_block(parent, &header, "};", BraceStyle::SameLine, BraceStyle::NewLine)?;
        sub.write(class, "public:\n")?;
        for formal in formals {
            sub.write(class, &format!("{};\n", formal))?;
        }
        let ctor_header = format!("{}({}) {{", ctor_name, formals.join(", "));
        let ctor_body = sub.new_block(class, &ctor_header, "}", BraceStyle::SameLine, BraceStyle::NewLine)?;
        for (name, _) in fields {
            sub.write(ctor_body, &format!("this->{0} = {0};\n", name))?;
        }
        sub.write(class, &format!("bool is_{}() {{ return true; }}\n", ctor_name))?;
        for (name, ty) in fields {
            let ret = self.type_name(ty);
            if co_inductive {
                sub.write(class, &format!("{} dtor_{}() {{ return this->{}(); }}\n", ret, name, name))?;
            } else {
                sub.write(class, &format!("{} dtor_{}() {{ return this->{}; }}\n", ret, name, name))?;
            }
        }
        Ok(class)
    }

    fn declare_newtype(&self, sub: &mut Substrate, parent: WriterId, name: &str, base: &Type, default_value: &str) -> EmitResult<()> {
        sub.write(
            parent,
            &format!("inline const {} DEFAULT_{} = {};\n", self.type_name(base), name.to_uppercase(), default_value),
        )
    }

    fn declare_subset_type(&self, sub: &mut Substrate, parent: WriterId, name: &str, base: &Type, default_value: &str) -> EmitResult<()> {
        self.declare_newtype(sub, parent, name, base, default_value)
    }

    fn emit_assign(&self, sub: &mut Substrate, w: WriterId, lhs: &str, rhs: &str) -> EmitResult<()> {
        sub.write(w, &format!("{} = {};\n", lhs, rhs))
    }

    fn emit_multi_assign(&self, sub: &mut Substrate, w: WriterId, lhs: &[String], call: &str) -> EmitResult<()> {
        sub.write(w, &format!("std::tie({}) = {};\n", lhs.join(", "), call))
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
        let header = format!("for (auto {v} = {lo}; {v} < {hi}; ++{v}) {{", v = var, lo = lo, hi = hi);
        sub.new_block(w, &header, "}", BraceStyle::SameLine, BraceStyle::NewLine)
    }

    fn emit_for_each(&self, sub: &mut Substrate, w: WriterId, var: &str, collection: &str) -> EmitResult<WriterId> {
        sub.new_block(w, &format!("for (auto const& {} : {}) {{", var, collection), "}", BraceStyle::SameLine, BraceStyle::NewLine)
    }

    fn emit_loop(&self, sub: &mut Substrate, w: WriterId, label: Option<&str>) -> EmitResult<WriterId> {
        let body = sub.new_block(w, "while (true) {", "}", BraceStyle::SameLine, BraceStyle::NewLine)?;
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
            _ => sub.write(w, &format!("return std::make_tuple({});\n", values.join(", "))),
        }
    }

    fn emit_yield(&self, sub: &mut Substrate, w: WriterId, values: &[String]) -> EmitResult<()> {
        sub.write(w, &format!("co_yield {};\n", if values.len() == 1 { values[0].clone() } else { format!("std::make_tuple({})", values.join(", ")) }))
    }

    fn emit_print(&self, sub: &mut Substrate, w: WriterId, args: &[String]) -> EmitResult<()> {
        sub.write(w, &format!("std::cout << {};\n", args.join(" << ")))
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
        format!("verity::BigInt(\"{}\")", digits)
    }

    fn lit_real(&self, digits: &str) -> String {
        format!("verity::BigDecimal(\"{}\")", digits)
    }

    fn lit_bitvector(&self, width: u32, value: u64) -> String {
        if width <= 32 {
            format!("{}u", value as u32)
        } else {
            format!("{}ull", value)
        }
    }

    fn lit_string(&self, s: &str) -> String {
        format!("std::string(\"{}\")", s.replace('\\', "\\\\").replace('"', "\\\""))
    }

    fn collection_display(&self, kind: CollectionKind, elems: &[String]) -> String {
        let ctor = match kind {
            CollectionKind::Set => "verity::VeritySet",
            CollectionKind::Seq => "verity::VeritySeq",
            CollectionKind::Multiset => "verity::VerityMultiset",
        };
        format!("{}::of({{{}}})", ctor, elems.join(", "))
    }

    fn map_display(&self, entries: &[(String, String)]) -> String {
        let pairs: Vec<String> = entries.iter().map(|(k, v)| format!("{{{}, {}}}", k, v)).collect();
        format!("verity::VerityMap::of({{{}}})", pairs.join(", "))
    }

    fn index_select(&self, collection: &str, index: &str) -> String {
        format!("{}.at({})", collection, index)
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
        let is_bignum = matches!(ty, Type::Int | Type::Real);
        match op {
            BinaryOp::EuclideanDiv => format!("verity::euclidean_div({}, {})", lhs, rhs),
            BinaryOp::EuclideanMod => format!("verity::euclidean_mod({}, {})", lhs, rhs),
            BinaryOp::Add => format!("({} + {})", lhs, rhs),
            BinaryOp::Sub => format!("({} - {})", lhs, rhs),
            BinaryOp::Mul => format!("({} * {})", lhs, rhs),
            BinaryOp::Eq if is_bignum => format!("({} == {})", lhs, rhs),
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
            BinaryOp::RotateLeft => format!("std::rotl({}, {})", lhs, rhs),
            BinaryOp::RotateRight => format!("std::rotr({}, {})", lhs, rhs),
            BinaryOp::SetUnion => format!("{}.union_with({})", lhs, rhs),
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
            UnaryOp::Negate => format!("(-{})", operand),
            UnaryOp::SetCardinality => format!("{}.size()", operand),
            UnaryOp::SeqLength => format!("{}.size()", operand),
        }
    }

    fn convert(&self, expr: &str, _from: &Type, to: &Type) -> String {
        format!("static_cast<{}>({})", self.type_name(to), expr)
    }

    fn quantifier(&self, kind: QuantifierKind, bound: &[String], range: Option<&str>, body: &str) -> String {
        let method = match kind {
            QuantifierKind::Forall => "forall",
            QuantifierKind::Exists => "exists",
        };
        let range = range.unwrap_or("true");
        format!(
            "verity::{}(std::vector<std::string>{{{}}}, [&]{{ return {}; }}, [&]{{ return {}; }})",
            method,
            bound.iter().map(|b| format!("\"{}\"", b)).collect::<Vec<_>>().join(", "),
            range,
            body
        )
    }

    fn set_comprehension(&self, bound: &[String], range: &str, term: &str) -> String {
        format!(
            "verity::set_comprehension(std::vector<std::string>{{{}}}, [&]{{ return {}; }}, [&]{{ return {}; }})",
            bound.iter().map(|b| format!("\"{}\"", b)).collect::<Vec<_>>().join(", "),
            range,
            term
        )
    }

    fn map_comprehension(&self, bound: &[String], range: &str, key: &str, value: &str) -> String {
        format!(
            "verity::map_comprehension(std::vector<std::string>{{{}}}, [&]{{ return {}; }}, [&]{{ return {}; }}, [&]{{ return {}; }})",
            bound.iter().map(|b| format!("\"{}\"", b)).collect::<Vec<_>>().join(", "),
            range,
            key,
            value
        )
    }

    fn lambda(&self, params: &[String], body: &str) -> String {
        format!("[&]({}) {{ return {}; }}", params.join(", "), body)
    }

    fn let_expr(&self, name: &str, value: &str, body: &str) -> String {
        format!("[&]{{ auto {} = {}; return {}; }}()", name, value, body)
    }

    fn tuple_type_name(&self, elem_types: &[String]) -> String {
        format!("std::tuple<{}>", elem_types.join(", "))
    }

    fn format_lazy_formal(&self, name: &str, ty: &Type) -> FormalText {
        format!("std::function<{}()> {}", self.type_name(ty), name)
    }

    fn lazy_thunk(&self, value: &str, ty: &Type) -> String {
        format!("std::function<{}()>([=]{{ return {}; }})", self.type_name(ty), value)
    }

    fn match_expr(&self, scrutinee: &str, arms: &[(String, String)]) -> String {
        let cases: Vec<String> = arms
            .iter()
            .map(|(ctor, body)| format!("(dynamic_cast<const {}*>(&{}) ? {} : ", ctor, scrutinee, body))
            .collect();
        format!("{}{}{}", cases.join(""), "throw std::logic_error(\"no matching variant\")", ")".repeat(arms.len()))
    }

    fn apply(&self, callee: &str, args: &[String]) -> String {
        format!("{}({})", callee, args.join(", "))
    }

    fn field_access(&self, receiver: Option<&str>, is_static: bool, name: &str) -> String {
        match receiver {
            Some(r) => format!("{}.{}", r, name),
            None if is_static => name.to_string(),
            None => format!("this->{}", name),
        }
    }

    fn type_name(&self, ty: &Type) -> String {
        match ty {
            Type::Bool => "bool".to_string(),
            Type::Char => "char32_t".to_string(),
            Type::Int => "verity::BigInt".to_string(),
            Type::Real => "verity::BigDecimal".to_string(),
            Type::Bitvector { width, .. } if *width <= 32 => "uint32_t".to_string(),
            Type::Bitvector { .. } => "uint64_t".to_string(),
            Type::Set(t) => format!("verity::VeritySet<{}>", self.type_name(t)),
            Type::Seq(t) => format!("verity::VeritySeq<{}>", self.type_name(t)),
            Type::Multiset(t) => format!("verity::VerityMultiset<{}>", self.type_name(t)),
            Type::Map(k, v) => format!("verity::VerityMap<{}, {}>", self.type_name(k), self.type_name(v)),
            Type::Array { elem, .. } => format!("std::vector<{}>", self.type_name(elem)),
            Type::UserDefined { .. } => "std::shared_ptr<void>".to_string(),
            Type::Arrow { .. } => "std::function<void()>".to_string(),
            Type::TypeParameter(name) => name.clone(),
            Type::TypeProxy => "auto".to_string(),
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
    fn class_block_uses_k_and_r_brace_style_with_semicolon_footer() {
        let backend = CppBackend;
        let mut sub = Substrate::new("  ");
        let root = sub.new_file("foo.hpp");
        let class = backend.open_class(&mut sub, root, "Foo", &[]).unwrap();
        sub.write(class, "int x;\n").unwrap();
        backend.close_scope(&mut sub, class);
        let files = sub.flush_to_strings();
        assert_eq!(files[0].1, "class Foo {\n  public:\n  int x;\n};\n");
    }

    #[test]
    fn templates_are_monomorphized_not_erased() {
        let backend = CppBackend;
        assert!(!backend.capabilities().erased_generics);
        assert!(!backend.capabilities().labeled_loops);
    }

    #[test]
    fn reserved_identifier_gets_disambiguated() {
        let backend = CppBackend;
        assert_eq!(backend.sanitize_ident("class"), "class_");
        assert_eq!(backend.sanitize_ident("total"), "total");
    }
}
