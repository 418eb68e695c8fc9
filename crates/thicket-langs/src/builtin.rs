use std::sync::OnceLock;

use thicket_core::Language;

use crate::generate::load_language;

macro_rules! define_langs {
    (
        $(
            $fn_name:ident => {
                feature: $feature:literal,
                grammar: $grammar:literal,
                names: [$($alias:literal),* $(,)?],
                extensions: [$($ext:literal),* $(,)?] $(,)?
            }
        ),* $(,)?
    ) => {
        // Each bundled grammar compiles on first use and is shared afterwards.
        $(
            #[cfg(feature = $feature)]
            pub fn $fn_name() -> Language {
                static LANG: OnceLock<Language> = OnceLock::new();
                LANG.get_or_init(|| {
                    load_language(include_str!(concat!("../grammars/", $grammar)))
                        .unwrap_or_else(|e| panic!("bundled grammar `{}` is invalid: {e}", $grammar))
                })
                .clone()
            }
        )*

        pub fn from_name(s: &str) -> Option<Language> {
            match s.to_ascii_lowercase().as_str() {
                $(
                    #[cfg(feature = $feature)]
                    $($alias)|* => Some($fn_name()),
                )*
                _ => None,
            }
        }

        pub fn from_ext(ext: &str) -> Option<Language> {
            match ext.to_ascii_lowercase().as_str() {
                $(
                    #[cfg(feature = $feature)]
                    $($ext)|* => Some($fn_name()),
                )*
                _ => None,
            }
        }

        /// Names of the bundled languages enabled in this build.
        pub fn names() -> Vec<&'static str> {
            vec![
                $(
                    #[cfg(feature = $feature)]
                    stringify!($fn_name),
                )*
            ]
        }

        pub fn all() -> Vec<Language> {
            vec![
                $(
                    #[cfg(feature = $feature)]
                    $fn_name(),
                )*
            ]
        }
    };
}

define_langs! {
    json => {
        feature: "lang-json",
        grammar: "json.json",
        names: ["json"],
        extensions: ["json"],
    },
    script => {
        feature: "lang-script",
        grammar: "script.json",
        names: ["script", "scr"],
        extensions: ["scr", "script"],
    },
    template => {
        feature: "lang-template",
        grammar: "template.json",
        names: ["template", "tmpl"],
        extensions: ["tmpl", "tpl"],
    },
}
