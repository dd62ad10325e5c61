//! Stable numeric identifiers into the arenas owned by [`crate::Program`].
//!
//! Members never hold a pointer or reference back to their enclosing
//! declaration; they hold one of these instead. That keeps the IR free of
//! cycles (a class whose method returns the class itself is just two ids
//! pointing at each other) and trivially copyable.

use std::fmt;

macro_rules! arena_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

arena_id!(ModuleId);
arena_id!(DeclId);
arena_id!(MemberId);
