//! The prototype-based scripting backend: emits JavaScript source. There is
//! no type system at the target level at all, so every type-parameterized
//! capability bit collapses to the most permissive setting: generics are
//! moot (hence erased), collections are duck-typed rather than trait-typed,
//! and there is no fixed-width integer distinct from `number`.

use std::collections::HashSet;

use verity_core::{Backend, BraceStyle, Capabilities, FormalText, StringRepr, Target};
use verity_emit::{EmitResult, Substrate, WriterId};
use verity_rir::{BinaryOp, CollectionKind, QuantifierKind, Type, UnaryOp};

const RUNTIME_SOURCE: &str = include_str!("../runtime/verity_runtime.js");

const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "export", "extends", "finally", "for", "function", "if", "import", "in",
    "instanceof", "let", "new", "return", "super", "switch", "this", "throw", "try", "typeof",
    "var", "void", "while", "with", "yield", "true", "false", "null", "undefined", "async",
    "await", "static", "get", "set",
];

pub struct JavaScriptBackend;

impl Backend for JavaScriptBackend {
    fn target(&self) -> Target {
        Target::JavaScript
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            erased_generics: true,
            native_int_widths: &[],
            trait_typed_collections: false,
            native_codatatypes: false,
            labeled_loops: true,
            max_tuple_arity: None,
            string_repr: StringRepr::CodeUnits,
        }
    }

    fn runtime_resource(&self) -> (&'static str, &'static str) {
        ("verity_runtime.js", RUNTIME_SOURCE)
    }

    fn open_module(&self, sub: &mut Substrate, parent: WriterId, _name: &str) -> EmitResult<WriterId> {
        sub.write(parent, "\"use strict\";\nconst VerityRuntime = require(\"./verity_runtime.js\");\n\n")?;
        Ok(parent)
    }

    fn open_class(&self, sub: &mut Substrate, parent: WriterId, name: &str, implements: &[String]) -> EmitResult<WriterId> {
        let _ = implements;
        sub.new_block(parent, &format!("class {} {{", name), "}", BraceStyle::SameLine, BraceStyle::NewLine)
    }

    fn open_member(&self, sub: &mut Substrate, parent: WriterId, signature: &str) -> EmitResult<WriterId> {
        sub.new_block(parent, &format!("{} {{", signature), "}", BraceStyle::SameLine, BraceStyle::NewLine)
    }

    fn declare_field(
        &self,
        sub: &mut Substrate,
        parent: WriterId,
        name: &str,
        _ty: &Type,
        is_static: bool,
        _is_const: bool,
        has_initializer: bool,
    ) -> EmitResult<(WriterId, Option<WriterId>)> {
        let prefix = if is_static { "static " } else { "" };
        let decl_line = sub.fork(parent)?;
        let init_fork = if has_initializer {
            sub.write(decl_line, &format!("{}{} = ", prefix, name))?;
            let f = sub.fork(decl_line)?;
            sub.write(decl_line, ";\n")?;
            Some(f)
        } else {
            sub.write(decl_line, &format!("{}{};\n", prefix, name))?;
            None
        };
        Ok((decl_line, init_fork))
    }

    fn declare_local(&self, sub: &mut Substrate, parent: WriterId, name: &str, _ty: &Type, init: Option<&str>) -> EmitResult<()> {
        match init {
            Some(rhs) => sub.write(parent, &format!("let {} = {};\n", name, rhs)),
            None => sub.write(parent, &format!("let {};\n", name)),
        }
    }

    fn format_formal(&self, name: &str, _ty: &Type) -> FormalText {
        name.to_string()
    }

    fn declare_datatype_base(&self, sub: &mut Substrate, parent: WriterId, name: &str) -> EmitResult<WriterId> {
        sub.new_block(parent, &format!("class {} {{", name), "}", BraceStyle::SameLine, BraceStyle::NewLine)
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
        let header = format!("class {} extends {} {{", ctor_name, base_name);
        let class = sub.new_block(parent, &header, "}", BraceStyle::SameLine, BraceStyle::NewLine)?;
        let ctor_header = format!("constructor({}) {{", formals.join(", "));
        let ctor_body = sub.new_block(class, &ctor_header, "}", BraceStyle::SameLine, BraceStyle::NewLine)?;
        sub.write(ctor_body, "super();\n")?;
        for formal in formals {
            sub.write(ctor_body, &format!("this.{0} = {0};\n", formal))?;
        }
        sub.write(class, &format!("is_{}() {{ return true; }}\n", ctor_name))?;
        for (name, _) in fields {
            if co_inductive {
                sub.write(class, &format!("dtor_{0}() {{ return this.{0}(); }}\n", name))?;
            } else {
                sub.write(class, &format!("dtor_{0}() {{ return this.{0}; }}\n", name))?;
            }
        }
        Ok(class)
    }

    fn declare_newtype(&self, sub: &mut Substrate, parent: WriterId, name: &str, _base: &Type, default_value: &str) -> EmitResult<()> {
        sub.write(parent, &format!("const DEFAULT_{} = {};\n", name.to_uppercase(), default_value))
    }

    fn declare_subset_type(&self, sub: &mut Substrate, parent: WriterId, name: &str, base: &Type, default_value: &str) -> EmitResult<()> {
        self.declare_newtype(sub, parent, name, base, default_value)
    }

    fn emit_assign(&self, sub: &mut Substrate, w: WriterId, lhs: &str, rhs: &str) -> EmitResult<()> {
        sub.write(w, &format!("{} = {};\n", lhs, rhs))
    }

    fn emit_multi_assign(&self, sub: &mut Substrate, w: WriterId, lhs: &[String], call: &str) -> EmitResult<()> {
        sub.write(w, &format!("[{}] = {};\n", lhs.join(", "), call))
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
        let header = format!("for (let {v} = {lo}; {v} < {hi}; {v}++) {{", v = var, lo = lo, hi = hi);
        sub.new_block(w, &header, "}", BraceStyle::SameLine, BraceStyle::NewLine)
    }

    fn emit_for_each(&self, sub: &mut Substrate, w: WriterId, var: &str, collection: &str) -> EmitResult<WriterId> {
        sub.new_block(w, &format!("for (const {} of {}) {{", var, collection), "}", BraceStyle::SameLine, BraceStyle::NewLine)
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
            _ => sub.write(w, &format!("return [{}];\n", values.join(", "))),
        }
    }

    fn emit_yield(&self, sub: &mut Substrate, w: WriterId, values: &[String]) -> EmitResult<()> {
        match values.len() {
            1 => sub.write(w, &format!("yield {};\n", values[0])),
            _ => sub.write(w, &format!("yield [{}];\n", values.join(", "))),
        }
    }

    fn emit_print(&self, sub: &mut Substrate, w: WriterId, args: &[String]) -> EmitResult<()> {
        sub.write(w, &format!("process.stdout.write({});\n", args.join(" + ")))
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
        format!("\"{}\"", c)
    }

    fn lit_int(&self, digits: &str) -> String {
        format!("{}n", digits)
    }

    fn lit_real(&self, digits: &str) -> String {
        format!("VerityRuntime.parseDecimal(\"{}\")", digits)
    }

    fn lit_bitvector(&self, _width: u32, value: u64) -> String {
        value.to_string()
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
        let pairs: Vec<String> = entries.iter().map(|(k, v)| format!("[{}, {}]", k, v)).collect();
        format!("VerityMap.of([{}])", pairs.join(", "))
    }

    fn index_select(&self, collection: &str, index: &str) -> String {
        format!("{}.get({})", collection, index)
    }

    fn index_update(&self, collection: &str, index: &str, value: &str) -> String {
        format!("{}.update({}, {})", collection, index, value)
    }

    fn seq_slice(&self, seq: &str, lo: Option<&str>, hi: Option<&str>) -> String {
        match (lo, hi) {
            (Some(lo), Some(hi)) => format!("{}.slice({}, {})", seq, lo, hi),
            (Some(lo), None) => format!("{}.slice({})", seq, lo),
            (None, Some(hi)) => format!("{}.slice(0, {})", seq, hi),
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

    fn binary_op(&self, op: BinaryOp, _ty: &Type, lhs: &str, rhs: &str) -> String {
        match op {
            BinaryOp::Add => format!("({} + {})", lhs, rhs),
            BinaryOp::Sub => format!("({} - {})", lhs, rhs),
            BinaryOp::Mul => format!("({} * {})", lhs, rhs),
            BinaryOp::EuclideanDiv => format!("VerityRuntime.euclideanDiv({}, {})", lhs, rhs),
            BinaryOp::EuclideanMod => format!("VerityRuntime.euclideanMod({}, {})", lhs, rhs),
            BinaryOp::Eq => format!("({} === {})", lhs, rhs),
            BinaryOp::Neq => format!("({} !== {})", lhs, rhs),
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
            UnaryOp::Negate => format!("(-{})", operand),
            UnaryOp::SetCardinality => format!("{}.size", operand),
            UnaryOp::SeqLength => format!("{}.length", operand),
        }
    }

    fn convert(&self, expr: &str, _from: &Type, _to: &Type) -> String {
        expr.to_string()
    }

    fn quantifier(&self, kind: QuantifierKind, bound: &[String], range: Option<&str>, body: &str) -> String {
        let method = match kind {
            QuantifierKind::Forall => "forall",
            QuantifierKind::Exists => "exists",
        };
        let range = range.unwrap_or("true");
        format!("VerityRuntime.{}([{}], () => {}, () => {})", method, bound.join(", "), range, body)
    }

    fn set_comprehension(&self, bound: &[String], range: &str, term: &str) -> String {
        format!("VerityRuntime.setComprehension([{}], () => {}, () => {})", bound.join(", "), range, term)
    }

    fn map_comprehension(&self, bound: &[String], range: &str, key: &str, value: &str) -> String {
        format!(
            "VerityRuntime.mapComprehension([{}], () => {}, () => {}, () => {})",
            bound.join(", "),
            range,
            key,
            value
        )
    }

    fn lambda(&self, params: &[String], body: &str) -> String {
        format!("(({}) => {})", params.join(", "), body)
    }

    fn let_expr(&self, name: &str, value: &str, body: &str) -> String {
        format!("(() => {{ const {} = {}; return {}; }})()", name, value, body)
    }

    fn format_lazy_formal(&self, name: &str, _ty: &Type) -> FormalText {
        name.to_string()
    }

    fn lazy_thunk(&self, value: &str, _ty: &Type) -> String {
        format!("(() => {})", value)
    }

    fn match_expr(&self, scrutinee: &str, arms: &[(String, String)]) -> String {
        let cases: Vec<String> = arms
            .iter()
            .map(|(ctor, body)| format!("({} instanceof {} ? {} : ", scrutinee, ctor, body))
            .collect();
        format!(
            "{}{}{}",
            cases.join(""),
            "(() => { throw new Error(\"no matching variant\"); })()",
            ")".repeat(arms.len())
        )
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

    fn type_name(&self, _ty: &Type) -> String {
        String::new()
    }

    fn needs_cast_after_arith(&self, _ty: &Type) -> bool {
        false
    }

    fn is_reserved(&self, ident: &str) -> bool {
        let set: HashSet<&str> = RESERVED.iter().copied().collect();
        set.contains(ident)
    }

    fn void_keyword(&self) -> &'static str {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn class_block_uses_k_and_r_brace_style() {
        let backend = JavaScriptBackend;
        let mut sub = Substrate::new("  ");
        let root = sub.new_file("foo.js");
        let class = backend.open_class(&mut sub, root, "Foo", &[]).unwrap();
        sub.write(class, "x = 0;\n").unwrap();
        backend.close_scope(&mut sub, class);
        let files = sub.flush_to_strings();
        assert_eq!(files[0].1, "class Foo {\n  x = 0;\n}\n");
    }

    #[test]
    fn there_is_no_native_fixed_width_integer() {
        let backend = JavaScriptBackend;
        assert!(backend.capabilities().native_int_widths.is_empty());
    }

    #[test]
    fn big_integers_are_native_bigint_literals() {
        let backend = JavaScriptBackend;
        assert_eq!(backend.lit_int("42"), "42n");
    }

    #[test]
    fn reserved_identifier_gets_disambiguated() {
        let backend = JavaScriptBackend;
        assert_eq!(backend.sanitize_ident("class"), "class_");
        assert_eq!(backend.sanitize_ident("total"), "total");
    }
}
