//! Runtime-selectable WebAssembly feature set.
//!
//! Every opcode, value type, and syntactic form that postdates the MVP is
//! tagged with the proposal that introduced it. Readers consult a [`Features`]
//! value before accepting such a form; the set is fixed for the duration of a
//! decode.
//!
//! # Example
//!
//! ```
//! use wasmlens::features::{Feature, Features};
//!
//! let features = Features::mvp().enable(Feature::Simd);
//! assert!(features.allows(Feature::Simd));
//! assert!(!features.allows(Feature::Threads));
//! ```

/// Expands one arm per feature flag, generating the struct fields, the
/// [`Feature`] enum, and the name table from a single list.
macro_rules! define_features {
    ($(($field:ident, $variant:ident, $name:literal)),* $(,)?) => {
        /// A set of independently togglable WebAssembly proposals.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct Features {
            $(pub $field: bool,)*
        }

        /// A single feature flag, used to tag gated forms.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Feature {
            /// Present in the original MVP; never gated.
            Mvp,
            $($variant,)*
        }

        impl Features {
            /// The MVP set: every proposal disabled.
            pub fn mvp() -> Self {
                Self::default()
            }

            /// Every proposal enabled.
            pub fn all() -> Self {
                Self {
                    $($field: true,)*
                }
            }

            /// Returns a copy with the given feature enabled.
            #[must_use]
            pub fn enable(mut self, feature: Feature) -> Self {
                match feature {
                    Feature::Mvp => {}
                    $(Feature::$variant => self.$field = true,)*
                }
                self
            }

            /// Whether a form gated on `feature` is acceptable under this set.
            pub fn allows(self, feature: Feature) -> bool {
                match feature {
                    Feature::Mvp => true,
                    $(Feature::$variant => self.$field,)*
                }
            }
        }

        impl Feature {
            /// The proposal's conventional name, as used in CLI flags and
            /// diagnostics.
            pub fn name(self) -> &'static str {
                match self {
                    Feature::Mvp => "mvp",
                    $(Feature::$variant => $name,)*
                }
            }
        }
    };
}

define_features! {
    (mutable_globals, MutableGlobals, "mutable-globals"),
    (saturating_float_to_int, SaturatingFloatToInt, "saturating-float-to-int"),
    (sign_extension, SignExtension, "sign-extension"),
    (simd, Simd, "simd"),
    (threads, Threads, "threads"),
    (multi_value, MultiValue, "multi-value"),
    (tail_call, TailCall, "tail-call"),
    (bulk_memory, BulkMemory, "bulk-memory"),
    (reference_types, ReferenceTypes, "reference-types"),
    (exceptions, Exceptions, "exceptions"),
    (function_references, FunctionReferences, "function-references"),
    (gc, Gc, "gc"),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mvp_allows_only_mvp() {
        let f = Features::mvp();
        assert!(f.allows(Feature::Mvp));
        assert!(!f.allows(Feature::Simd));
        assert!(!f.allows(Feature::BulkMemory));
    }

    #[test]
    fn all_allows_everything() {
        let f = Features::all();
        assert!(f.allows(Feature::Mvp));
        assert!(f.allows(Feature::Simd));
        assert!(f.allows(Feature::Gc));
    }

    #[test]
    fn enable_is_additive() {
        let f = Features::mvp()
            .enable(Feature::Simd)
            .enable(Feature::Threads);
        assert!(f.allows(Feature::Simd));
        assert!(f.allows(Feature::Threads));
        assert!(!f.allows(Feature::Exceptions));
    }

    #[test]
    fn feature_names() {
        assert_eq!(Feature::Simd.name(), "simd");
        assert_eq!(Feature::SaturatingFloatToInt.name(), "saturating-float-to-int");
    }
}
