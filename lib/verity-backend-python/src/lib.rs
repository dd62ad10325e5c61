//! The dynamic interpreted backend: emits Python source. Python's `int` is
//! already arbitrary-precision, so unlike Java/C#/Go this backend needs no
//! bignum wrapper for `Int` — native int literals go straight through.
//! Blocks are framed by a colon-terminated header and pure indentation, no
//! closing delimiter at all.

use std::collections::HashSet;

use verity_core::{Backend, BraceStyle, Capabilities, FormalText, StringRepr, Target};
use verity_emit::{EmitResult, Substrate, WriterId};
use verity_rir::{BinaryOp, CollectionKind, QuantifierKind, Type, UnaryOp};

const RUNTIME_SOURCE: &str = include_str!("../runtime/verity_runtime.py");

const RESERVED: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield", "match", "case",
];

pub struct PythonBackend;

impl PythonBackend {
    fn block(&self, sub: &mut Substrate, parent: WriterId, header: &str) -> EmitResult<WriterId> {
        sub.new_block(parent, header, "", BraceStyle::SameLine, BraceStyle::NewLine)
    }
}

impl Backend for PythonBackend {
    fn target(&self) -> Target {
        Target::Python
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            erased_generics: true,
            native_int_widths: &[],
            trait_typed_collections: false,
            native_codatatypes: false,
            labeled_loops: false,
            max_tuple_arity: None,
            string_repr: StringRepr::Object,
        }
    }

    fn runtime_resource(&self) -> (&'static str, &'static str) {
        ("verity_runtime.py", RUNTIME_SOURCE)
    }

    fn open_module(&self, sub: &mut Substrate, parent: WriterId, _name: &str) -> EmitResult<WriterId> {
        sub.write(parent, "from . import verity_runtime as VerityRuntime\n\n")?;
        Ok(parent)
    }

    fn open_class(&self, sub: &mut Substrate, parent: WriterId, name: &str, implements: &[String]) -> EmitResult<WriterId> {
        let header = if implements.is_empty() {
            format!("class {}:", name)
        } else {
            format!("class {}({}):", name, implements.join(", "))
        };
        self.block(sub, parent, &header)
    }

    fn open_member(&self, sub: &mut Substrate, parent: WriterId, signature: &str) -> EmitResult<WriterId> {
        self.block(sub, parent, &format!("{}:", signature))
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
        let target = if is_static { name.to_string() } else { format!("self.{}", name) };
        let decl_line = sub.fork(parent)?;
        let init_fork = if has_initializer {
            sub.write(decl_line, &format!("{} = ", target))?;
            let f = sub.fork(decl_line)?;
            sub.write(decl_line, "\n")?;
            Some(f)
        } else {
            sub.write(decl_line, &format!("{} = None\n", target))?;
            None
        };
        Ok((decl_line, init_fork))
    }

    fn declare_local(&self, sub: &mut Substrate, parent: WriterId, name: &str, _ty: &Type, init: Option<&str>) -> EmitResult<()> {
        match init {
            Some(rhs) => sub.write(parent, &format!("{} = {}\n", name, rhs)),
            None => sub.write(parent, &format!("{} = None\n", name)),
        }
    }

    fn format_formal(&self, name: &str, _ty: &Type) -> FormalText {
        name.to_string()
    }

    fn declare_datatype_base(&self, sub: &mut Substrate, parent: WriterId, name: &str) -> EmitResult<WriterId> {
        self.block(sub, parent, &format!("class {}:", name))
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
        let class = self.block(sub, parent, &format!("class {}({}):", ctor_name, base_name))?;
        let params: Vec<String> = std::iter::once("self".to_string()).chain(formals.iter().cloned()).collect();
        let ctor_body = self.block(sub, class, &format!("def __init__({}):", params.join(", ")))?;
        for formal in formals {
            sub.write(ctor_body, &format!("self.{0} = {0}\n", formal))?;
        }
        let is_body = self.block(sub, class, &format!("def is_{}(self):", ctor_name))?;
        sub.write(is_body, "return True\n")?;
        for (name, _) in fields {
            let dtor_body = self.block(sub, class, &format!("def dtor_{}(self):", name))?;
            if co_inductive {
                sub.write(dtor_body, &format!("return self.{}()\n", name))?;
            } else {
                sub.write(dtor_body, &format!("return self.{}\n", name))?;
            }
        }
        Ok(class)
    }

    fn declare_newtype(&self, sub: &mut Substrate, parent: WriterId, name: &str, _base: &Type, default_value: &str) -> EmitResult<()> {
        sub.write(parent, &format!("DEFAULT_{} = {}\n", name.to_uppercase(), default_value))
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
        let then_w = self.block(sub, w, &format!("if {}:", cond))?;
        let else_w = self.block(sub, w, "else:")?;
        Ok((then_w, else_w))
    }

    fn emit_while(&self, sub: &mut Substrate, w: WriterId, cond: &str) -> EmitResult<WriterId> {
        self.block(sub, w, &format!("while {}:", cond))
    }

    fn emit_for_range(&self, sub: &mut Substrate, w: WriterId, var: &str, lo: &str, hi: &str) -> EmitResult<WriterId> {
        self.block(sub, w, &format!("for {} in range({}, {}):", var, lo, hi))
    }

    fn emit_for_each(&self, sub: &mut Substrate, w: WriterId, var: &str, collection: &str) -> EmitResult<WriterId> {
        self.block(sub, w, &format!("for {} in {}:", var, collection))
    }

    fn emit_loop(&self, sub: &mut Substrate, w: WriterId, label: Option<&str>) -> EmitResult<WriterId> {
        // Python has no loop labels; the driver instead wraps a labeled loop
        // body in a function raising a dedicated break-sentinel exception
        // named after the label, caught right after the call.
        let header = match label {
            Some(l) => format!("while True:  # label {}", l),
            None => "while True:".to_string(),
        };
        self.block(sub, w, &header)
    }

    fn emit_break(&self, sub: &mut Substrate, w: WriterId, label: Option<&str>) -> EmitResult<()> {
        match label {
            Some(l) => sub.write(w, &format!("raise _Break_{}()\n", l)),
            None => sub.write(w, "break\n"),
        }
    }

    fn emit_return(&self, sub: &mut Substrate, w: WriterId, values: &[String]) -> EmitResult<()> {
        match values.len() {
            0 => sub.write(w, "return\n"),
            1 => sub.write(w, &format!("return {}\n", values[0])),
            _ => sub.write(w, &format!("return ({})\n", values.join(", "))),
        }
    }

    fn emit_yield(&self, sub: &mut Substrate, w: WriterId, values: &[String]) -> EmitResult<()> {
        match values.len() {
            1 => sub.write(w, &format!("yield {}\n", values[0])),
            _ => sub.write(w, &format!("yield ({})\n", values.join(", "))),
        }
    }

    fn emit_print(&self, sub: &mut Substrate, w: WriterId, args: &[String]) -> EmitResult<()> {
        sub.write(w, &format!("print({}, end=\"\")\n", args.join(" + ")))
    }

    fn emit_call_stmt(&self, sub: &mut Substrate, w: WriterId, call: &str) -> EmitResult<()> {
        sub.write(w, &format!("{}\n", call))
    }

    fn emit_absurd(&self, sub: &mut Substrate, w: WriterId) -> EmitResult<()> {
        sub.write(w, "# unreachable: erased specification-only construct\n")
    }

    fn lit_bool(&self, b: bool) -> String {
        if b { "True".to_string() } else { "False".to_string() }
    }

    fn lit_char(&self, c: char) -> String {
        format!("\"{}\"", c)
    }

    fn lit_int(&self, digits: &str) -> String {
        digits.to_string()
    }

    fn lit_real(&self, digits: &str) -> String {
        format!("decimal.Decimal(\"{}\")", digits)
    }

    fn lit_bitvector(&self, _width: u32, value: u64) -> String {
        value.to_string()
    }

    fn lit_string(&self, s: &str) -> String {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
    }

    fn collection_display(&self, kind: CollectionKind, elems: &[String]) -> String {
        let ctor = match kind {
            CollectionKind::Set => "VerityRuntime.VeritySet",
            CollectionKind::Seq => "VerityRuntime.VeritySeq",
            CollectionKind::Multiset => "VerityRuntime.VerityMultiset",
        };
        format!("{}([{}])", ctor, elems.join(", "))
    }

    fn map_display(&self, entries: &[(String, String)]) -> String {
        let pairs: Vec<String> = entries.iter().map(|(k, v)| format!("({}, {})", k, v)).collect();
        format!("VerityRuntime.VerityMap([{}])", pairs.join(", "))
    }

    fn index_select(&self, collection: &str, index: &str) -> String {
        format!("{}[{}]", collection, index)
    }

    fn index_update(&self, collection: &str, index: &str, value: &str) -> String {
        format!("{}.update({}, {})", collection, index, value)
    }

    fn seq_slice(&self, seq: &str, lo: Option<&str>, hi: Option<&str>) -> String {
        format!("{}[{}:{}]", seq, lo.unwrap_or(""), hi.unwrap_or(""))
    }

    fn array_select(&self, array: &str, indices: &[String]) -> String {
        format!("{}[{}]", array, indices.join("]["))
    }

    fn binary_op(&self, op: BinaryOp, _ty: &Type, lhs: &str, rhs: &str) -> String {
        match op {
            BinaryOp::Add => format!("({} + {})", lhs, rhs),
            BinaryOp::Sub => format!("({} - {})", lhs, rhs),
            BinaryOp::Mul => format!("({} * {})", lhs, rhs),
            BinaryOp::EuclideanDiv => format!("VerityRuntime.euclidean_div({}, {})", lhs, rhs),
            BinaryOp::EuclideanMod => format!("VerityRuntime.euclidean_mod({}, {})", lhs, rhs),
            BinaryOp::Eq => format!("({} == {})", lhs, rhs),
            BinaryOp::Neq => format!("({} != {})", lhs, rhs),
            BinaryOp::Lt => format!("({} < {})", lhs, rhs),
            BinaryOp::Gt => format!("({} > {})", lhs, rhs),
            BinaryOp::Le => format!("({} <= {})", lhs, rhs),
            BinaryOp::Ge => format!("({} >= {})", lhs, rhs),
            BinaryOp::And => format!("({} and {})", lhs, rhs),
            BinaryOp::Or => format!("({} or {})", lhs, rhs),
            BinaryOp::BitAnd => format!("({} & {})", lhs, rhs),
            BinaryOp::BitOr => format!("({} | {})", lhs, rhs),
            BinaryOp::BitXor => format!("({} ^ {})", lhs, rhs),
            BinaryOp::ShiftLeft => format!("({} << {})", lhs, rhs),
            BinaryOp::ShiftRight => format!("({} >> {})", lhs, rhs),
            BinaryOp::RotateLeft => format!("VerityRuntime.rotate_left({}, {})", lhs, rhs),
            BinaryOp::RotateRight => format!("VerityRuntime.rotate_right({}, {})", lhs, rhs),
            BinaryOp::SetUnion => format!("({} | {})", lhs, rhs),
            BinaryOp::SetIntersect => format!("({} & {})", lhs, rhs),
            BinaryOp::SetDifference => format!("({} - {})", lhs, rhs),
            BinaryOp::SeqConcat => format!("({} + {})", lhs, rhs),
            BinaryOp::In => format!("({} in {})", lhs, rhs),
            BinaryOp::NotIn => format!("({} not in {})", lhs, rhs),
        }
    }

    fn unary_op(&self, op: UnaryOp, operand: &str) -> String {
        match op {
            UnaryOp::Not => format!("(not {})", operand),
            UnaryOp::Negate => format!("(-{})", operand),
            UnaryOp::SetCardinality => format!("len({})", operand),
            UnaryOp::SeqLength => format!("len({})", operand),
        }
    }

    fn convert(&self, expr: &str, _from: &Type, to: &Type) -> String {
        match to {
            Type::Real => format!("decimal.Decimal({})", expr),
            Type::Int => format!("int({})", expr),
            _ => expr.to_string(),
        }
    }

    fn quantifier(&self, kind: QuantifierKind, bound: &[String], range: Option<&str>, body: &str) -> String {
        let method = match kind {
            QuantifierKind::Forall => "all",
            QuantifierKind::Exists => "any",
        };
        let range = range.unwrap_or("True");
        format!("{}({} for {} in {} if {})", method, body, bound.join(", "), range, range)
    }

    fn set_comprehension(&self, bound: &[String], range: &str, term: &str) -> String {
        format!("{{{} for {} in {}}}", term, bound.join(", "), range)
    }

    fn map_comprehension(&self, bound: &[String], range: &str, key: &str, value: &str) -> String {
        format!("{{{}: {} for {} in {}}}", key, value, bound.join(", "), range)
    }

    fn lambda(&self, params: &[String], body: &str) -> String {
        format!("(lambda {}: {})", params.join(", "), body)
    }

    fn let_expr(&self, name: &str, value: &str, body: &str) -> String {
        format!("(lambda {}: {})({})", name, body, value)
    }

    fn if_expr(&self, cond: &str, then_branch: &str, else_branch: &str) -> String {
        format!("({} if {} else {})", then_branch, cond, else_branch)
    }

    fn format_lazy_formal(&self, name: &str, _ty: &Type) -> FormalText {
        name.to_string()
    }

    fn lazy_thunk(&self, value: &str, _ty: &Type) -> String {
        format!("(lambda: {})", value)
    }

    fn match_expr(&self, scrutinee: &str, arms: &[(String, String)]) -> String {
        let cases: Vec<String> = arms
            .iter()
            .map(|(ctor, body)| format!("{} if isinstance({}, {}) else ", body, scrutinee, ctor))
            .collect();
        format!("({}VerityRuntime.absurd())", cases.join(""))
    }

    fn apply(&self, callee: &str, args: &[String]) -> String {
        format!("{}({})", callee, args.join(", "))
    }

    fn field_access(&self, receiver: Option<&str>, is_static: bool, name: &str) -> String {
        match receiver {
            Some(r) => format!("{}.{}", r, name),
            None if is_static => name.to_string(),
            None => format!("self.{}", name),
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
    fn class_block_is_a_bare_colon_header_with_pure_indentation() {
        let backend = PythonBackend;
        let mut sub = Substrate::new("    ");
        let root = sub.new_file("foo.py");
        let class = backend.open_class(&mut sub, root, "Foo", &[]).unwrap();
        sub.write(class, "x = 0\n").unwrap();
        backend.close_scope(&mut sub, class);
        let files = sub.flush_to_strings();
        assert_eq!(files[0].1, "class Foo:\n    x = 0\n");
    }

    #[test]
    fn native_int_is_already_arbitrary_precision() {
        let backend = PythonBackend;
        assert_eq!(backend.lit_int("123456789012345678901234567890"), "123456789012345678901234567890");
    }

    #[test]
    fn reserved_identifier_gets_disambiguated() {
        let backend = PythonBackend;
        assert_eq!(backend.sanitize_ident("class"), "class_");
        assert_eq!(backend.sanitize_ident("total"), "total");
    }

    #[test]
    fn no_labeled_loops_capability() {
        let backend = PythonBackend;
        assert!(!backend.capabilities().labeled_loops);
    }
}
