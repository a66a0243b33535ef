use crate::utils::{apply_derives, duplicate_key, expect_bool, parse_kvs};
use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Item, Result, parse::Parse, parse::ParseStream, parse_macro_input};

/// #[value_object] 宏实现
/// - 支持结构体（具名或 tuple）与枚举
/// - 合并/追加派生：Default, Clone, (Debug 可控), Serialize, Deserialize, PartialEq, Eq
/// - 参数：
///   - `debug = true|false`，默认 true
///   - `copy = true|false`，追加 Copy，默认 false
///   - `ord = true|false`，追加 PartialOrd, Ord, Hash，默认 false
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as ValueObjectAttrConfig);
    let mut input = parse_macro_input!(item as Item);

    let mut required: Vec<syn::Path> = vec![
        syn::parse_quote!(Default),
        syn::parse_quote!(Clone),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
        syn::parse_quote!(PartialEq),
        syn::parse_quote!(Eq),
    ];

    if cfg.debug.unwrap_or(true) {
        required.insert(0, syn::parse_quote!(Debug));
    }
    if cfg.copy.unwrap_or(false) {
        required.push(syn::parse_quote!(Copy));
    }
    if cfg.ord.unwrap_or(false) {
        required.push(syn::parse_quote!(PartialOrd));
        required.push(syn::parse_quote!(Ord));
        required.push(syn::parse_quote!(Hash));
    }

    match &mut input {
        Item::Struct(st) => {
            apply_derives(&mut st.attrs, required);
            TokenStream::from(quote! { #st })
        }
        Item::Enum(en) => {
            apply_derives(&mut en.attrs, required);
            TokenStream::from(quote! { #en })
        }
        other => syn::Error::new(other.span(), "#[value_object] only supports struct or enum")
            .to_compile_error()
            .into(),
    }
}

// -------- parsing --------

#[derive(Default)]
struct ValueObjectAttrConfig {
    debug: Option<bool>,
    copy: Option<bool>,
    ord: Option<bool>,
}

impl Parse for ValueObjectAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut cfg = Self::default();

        for kv in parse_kvs(input)? {
            let slot = match kv.key.to_string().as_str() {
                "debug" => &mut cfg.debug,
                "copy" => &mut cfg.copy,
                "ord" => &mut cfg.ord,
                _ => {
                    return Err(syn::Error::new(
                        kv.key.span(),
                        "unknown key in attribute; expected 'debug' | 'copy' | 'ord'",
                    ));
                }
            };
            if slot.is_some() {
                return Err(duplicate_key(&kv));
            }
            *slot = Some(expect_bool(&kv)?);
        }

        Ok(cfg)
    }
}
