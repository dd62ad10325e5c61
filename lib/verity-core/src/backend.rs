//! The backend capability interface: the contract every
//! concrete target implements, covering every operation group a lowering
//! pass needs — file/scoping, declarations, statements, expressions,
//! queries — as a method group here.
//!
//! Expression-emitting methods return an already-formatted `String` rather
//! than a writer handle: expression text is built bottom-up and spliced
//! into the statement that encloses it.

use crate::numeric;
use crate::options::Target;
use verity_emit::{EmitResult, Substrate, WriterId};
use verity_rir::{BinaryOp, CollectionKind, QuantifierKind, Type, UnaryOp};

/// A backend's representation of compiled strings: either a sequence of
/// UTF-16/UTF-8 code units (Java/C#/Go/JS/C++ all model strings this way)
/// or a first-class object with its own identity that the runtime must
/// allocate through (kept distinct because it changes how string literals
/// and concatenation are emitted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringRepr {
    CodeUnits,
    Object,
}

/// Static capability bits a backend advertises to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub erased_generics: bool,
    pub native_int_widths: &'static [u32],
    pub trait_typed_collections: bool,
    pub native_codatatypes: bool,
    pub labeled_loops: bool,
    pub max_tuple_arity: Option<usize>,
    pub string_repr: StringRepr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BraceStyle {
    SameLine,
    NewLine,
}

impl From<BraceStyle> for verity_emit::BraceStyle {
    fn from(style: BraceStyle) -> Self {
        match style {
            BraceStyle::SameLine => verity_emit::BraceStyle::SameLine,
            BraceStyle::NewLine => verity_emit::BraceStyle::NewLine,
        }
    }
}

/// One formal parameter already rendered to target syntax (e.g.
/// `"int x"` or `"x"` for a backend with no type annotations).
pub type FormalText = String;

/// `(header, footer)` pair a backend supplies to `open_class`/`open_member`
/// etc — plain strings, already including whatever delimiter the target
/// uses (`"{"`/`"}"`, or empty for an indentation-only target).
pub type Delims = (&'static str, &'static str);

pub trait Backend {
    fn target(&self) -> Target;
    fn capabilities(&self) -> Capabilities;
    /// `(filename, contents)` of this backend's embedded runtime blob
    ///; copied verbatim by the driver.
    fn runtime_resource(&self) -> (&'static str, &'static str);

    // ---- File and scoping -------------------------------
    fn create_file(&self, sub: &mut Substrate, relative_path: &str) -> WriterId {
        sub.new_file(relative_path)
    }
    fn open_module(&self, sub: &mut Substrate, parent: WriterId, name: &str) -> EmitResult<WriterId>;
    fn open_class(
        &self,
        sub: &mut Substrate,
        parent: WriterId,
        name: &str,
        implements: &[String],
    ) -> EmitResult<WriterId>;
    fn open_member(&self, sub: &mut Substrate, parent: WriterId, signature: &str) -> EmitResult<WriterId>;
    fn close_scope(&self, sub: &mut Substrate, writer: WriterId) {
        sub.close(writer);
    }

    // ---- Declarations ---------------------------------------------------
    /// Returns the writer for the declaration line and, if the field has an
    /// initializer, a fork to backfill the RHS into.
    fn declare_field(
        &self,
        sub: &mut Substrate,
        parent: WriterId,
        name: &str,
        ty: &Type,
        is_static: bool,
        is_const: bool,
        has_initializer: bool,
    ) -> EmitResult<(WriterId, Option<WriterId>)>;
    fn declare_local(&self, sub: &mut Substrate, parent: WriterId, name: &str, ty: &Type, init: Option<&str>) -> EmitResult<()>;
    fn format_formal(&self, name: &str, ty: &Type) -> FormalText;
    fn declare_datatype_base(&self, sub: &mut Substrate, parent: WriterId, name: &str) -> EmitResult<WriterId>;
    fn declare_datatype_variant(
        &self,
        sub: &mut Substrate,
        parent: WriterId,
        base_name: &str,
        ctor_name: &str,
        formals: &[FormalText],
        fields: &[(String, Type)],
        co_inductive: bool,
    ) -> EmitResult<WriterId>;
    fn declare_newtype(&self, sub: &mut Substrate, parent: WriterId, name: &str, base: &Type, default_value: &str) -> EmitResult<()>;
    fn declare_subset_type(&self, sub: &mut Substrate, parent: WriterId, name: &str, base: &Type, default_value: &str) -> EmitResult<()>;

    // ---- Statements ------------------------------------------------------
    fn emit_assign(&self, sub: &mut Substrate, w: WriterId, lhs: &str, rhs: &str) -> EmitResult<()>;
    fn emit_multi_assign(&self, sub: &mut Substrate, w: WriterId, lhs: &[String], call: &str) -> EmitResult<()>;
    fn emit_if(&self, sub: &mut Substrate, w: WriterId, cond: &str) -> EmitResult<(WriterId, WriterId)>;
    fn emit_while(&self, sub: &mut Substrate, w: WriterId, cond: &str) -> EmitResult<WriterId>;
    fn emit_for_range(&self, sub: &mut Substrate, w: WriterId, var: &str, lo: &str, hi: &str) -> EmitResult<WriterId>;
    fn emit_for_each(&self, sub: &mut Substrate, w: WriterId, var: &str, collection: &str) -> EmitResult<WriterId>;
    fn emit_loop(&self, sub: &mut Substrate, w: WriterId, label: Option<&str>) -> EmitResult<WriterId>;
    fn emit_break(&self, sub: &mut Substrate, w: WriterId, label: Option<&str>) -> EmitResult<()>;
    fn emit_return(&self, sub: &mut Substrate, w: WriterId, values: &[String]) -> EmitResult<()>;
    fn emit_yield(&self, sub: &mut Substrate, w: WriterId, values: &[String]) -> EmitResult<()>;
    fn emit_print(&self, sub: &mut Substrate, w: WriterId, args: &[String]) -> EmitResult<()>;
    fn emit_call_stmt(&self, sub: &mut Substrate, w: WriterId, call: &str) -> EmitResult<()>;
    fn emit_absurd(&self, sub: &mut Substrate, w: WriterId) -> EmitResult<()>;

    // ---- Expressions: bottom-up string construction ---------------------
    fn lit_bool(&self, b: bool) -> String;
    fn lit_char(&self, c: char) -> String;
    fn lit_int(&self, digits: &str) -> String;
    fn lit_real(&self, digits: &str) -> String;
    fn lit_bitvector(&self, width: u32, value: u64) -> String;
    fn lit_string(&self, s: &str) -> String;
    fn collection_display(&self, kind: CollectionKind, elems: &[String]) -> String;
    fn map_display(&self, entries: &[(String, String)]) -> String;
    fn index_select(&self, collection: &str, index: &str) -> String;
    fn index_update(&self, collection: &str, index: &str, value: &str) -> String;
    fn seq_slice(&self, seq: &str, lo: Option<&str>, hi: Option<&str>) -> String;
    fn array_select(&self, array: &str, indices: &[String]) -> String;
    fn binary_op(&self, op: BinaryOp, ty: &Type, lhs: &str, rhs: &str) -> String;
    fn unary_op(&self, op: UnaryOp, operand: &str) -> String;
    fn convert(&self, expr: &str, from: &Type, to: &Type) -> String;
    fn quantifier(&self, kind: QuantifierKind, bound: &[String], range: Option<&str>, body: &str) -> String;
    fn set_comprehension(&self, bound: &[String], range: &str, term: &str) -> String;
    fn map_comprehension(&self, bound: &[String], range: &str, key: &str, value: &str) -> String;
    fn lambda(&self, params: &[String], body: &str) -> String;
    fn let_expr(&self, name: &str, value: &str, body: &str) -> String;
    fn match_expr(&self, scrutinee: &str, arms: &[(String, String)]) -> String;
    fn apply(&self, callee: &str, args: &[String]) -> String;
    fn field_access(&self, receiver: Option<&str>, is_static: bool, name: &str) -> String;

    /// Renders `cond`/`then`/`else` as a single expression. Every target but
    /// Go has some native conditional-expression form (the default here is
    /// the C-family ternary); Go has none, so it overrides this with an
    /// immediately-invoked closure the same way its own `let_expr` already
    /// does for let-bindings.
    fn if_expr(&self, cond: &str, then_branch: &str, else_branch: &str) -> String {
        format!("({} ? {} : {})", cond, then_branch, else_branch)
    }

    /// Renders the type of a synthesized multi-value return tuple, given the
    /// element types in order. Defaults to a bare parenthesized list (C#'s
    /// `ValueTuple` literal syntax); overridden by targets with no anonymous
    /// tuple type of their own (Java's `TupleN<...>`, C++'s `std::tuple<...>`).
    fn tuple_type_name(&self, elem_types: &[String]) -> String {
        format!("({})", elem_types.join(", "))
    }

    /// The formal-parameter/field text for a co-inductive constructor
    /// argument, which is wrapped in a zero-argument thunk rather than
    /// stored directly so the datatype stays finite to construct.
    fn format_lazy_formal(&self, name: &str, ty: &Type) -> FormalText;
    /// Wraps `value` in the zero-argument thunk `format_lazy_formal`
    /// declared a slot for.
    fn lazy_thunk(&self, value: &str, ty: &Type) -> String;

    // ---- Queries -----------------------------------------------------
    fn type_name(&self, ty: &Type) -> String;
    /// Whether a value of `ty` needs an explicit mask after `+`/`-`/`*`
    /// to stay within its declared bit width. The default consults the
    /// bitvector's native backing width via `numeric::needs_mask`; a
    /// backend with no native fixed-width integers at all (JavaScript,
    /// Python) overrides this to `false` since it never emits the
    /// corresponding native arithmetic operator in the first place.
    fn needs_cast_after_arith(&self, ty: &Type) -> bool {
        match ty {
            Type::Bitvector { width, native_backing: Some(k) } => numeric::needs_mask(*width, *k),
            Type::Bitvector { native_backing: None, .. } => true,
            _ => false,
        }
    }
    fn is_reserved(&self, ident: &str) -> bool;

    /// The spelling of "no return value" in a method signature. Every
    /// backend that annotates return types at all uses `"void"`; the two
    /// that never annotate types (JavaScript, Python) override this to an
    /// empty string since `type_name` never appears in their signatures
    /// either.
    fn void_keyword(&self) -> &'static str {
        "void"
    }

    /// Appends the backend's reserved-word disambiguation suffix if
    /// `ident` collides, otherwise returns it unchanged.
    fn sanitize_ident(&self, ident: &str) -> String {
        if self.is_reserved(ident) {
            format!("{}_", ident)
        } else {
            ident.to_string()
        }
    }
}
