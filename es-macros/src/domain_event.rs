use crate::utils::{apply_derives, duplicate_key, expect_str, parse_kvs};
use proc_macro::TokenStream;
use quote::quote;
use std::collections::HashMap;
use syn::spanned::Spanned;
use syn::{Item, Result, parse_macro_input};

/// #[domain_event] 宏实现
/// - 仅支持具名字段变体：`Variant { .. }`，且枚举至少包含一个变体
/// - 合并/追加默认派生：Debug, Clone, PartialEq, Serialize, Deserialize
/// - 以 `#[serde(tag = "type", content = "data")]` 序列化，判别字段即事件类型名
/// - 生成 `::es_domain::domain_event::DomainEvent` 实现（EVENT_TYPES / event_type）
/// - 事件类型名默认 `EnumName.Variant`，变体可覆写：`#[event(event_type = "...")]`
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        let attr: proc_macro2::TokenStream = attr.into();
        return syn::Error::new(attr.span(), "#[domain_event] takes no arguments")
            .to_compile_error()
            .into();
    }

    let mut input = parse_macro_input!(item as Item);

    let enum_item = match &mut input {
        Item::Enum(e) => e,
        other => {
            return syn::Error::new(
                other.span(),
                "#[domain_event] can only be used on enum types",
            )
            .to_compile_error()
            .into();
        }
    };

    if enum_item.variants.is_empty() {
        return syn::Error::new(
            enum_item.ident.span(),
            "#[domain_event] requires at least one variant",
        )
        .to_compile_error()
        .into();
    }

    let required: Vec<syn::Path> = vec![
        syn::parse_quote!(Debug),
        syn::parse_quote!(Clone),
        syn::parse_quote!(PartialEq),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
    ];
    apply_derives(&mut enum_item.attrs, required);
    enum_item
        .attrs
        .push(syn::parse_quote!(#[serde(tag = "type", content = "data")]));

    let enum_name_string = enum_item.ident.to_string();

    // 事件类型名 -> 变体名，用于检测重复
    let mut seen: HashMap<String, String> = HashMap::new();
    let mut variant_types: Vec<(syn::Ident, syn::LitStr)> = Vec::new();

    for v in &mut enum_item.variants {
        if !matches!(v.fields, syn::Fields::Named(_)) {
            return syn::Error::new(
                v.span(),
                "#[domain_event] supports only named-field enum variants, e.g., Variant { x: T }",
            )
            .to_compile_error()
            .into();
        }

        let mut retained_attrs = Vec::new();
        let mut type_lit: Option<syn::LitStr> = None;

        for attr in v.attrs.iter() {
            if attr.path().is_ident("event") {
                match parse_variant_event_attr(attr) {
                    Ok(Some(lit)) => {
                        if type_lit.is_some() {
                            return syn::Error::new(
                                attr.span(),
                                "duplicate 'event_type' specified for this variant",
                            )
                            .to_compile_error()
                            .into();
                        }
                        type_lit = Some(lit);
                    }
                    Ok(None) => {}
                    Err(err) => return err.to_compile_error().into(),
                }
            } else {
                retained_attrs.push(attr.clone());
            }
        }

        let lit = type_lit.unwrap_or_else(|| {
            syn::LitStr::new(&format!("{}.{}", enum_name_string, v.ident), v.ident.span())
        });

        if lit.value().trim().is_empty() {
            return syn::Error::new(lit.span(), "event_type must not be empty")
                .to_compile_error()
                .into();
        }

        if let Some(prev) = seen.insert(lit.value(), v.ident.to_string()) {
            return syn::Error::new(
                lit.span(),
                format!(
                    "event type \"{}\" is already used by variant `{}`",
                    lit.value(),
                    prev
                ),
            )
            .to_compile_error()
            .into();
        }

        retained_attrs.push(syn::parse_quote!(#[serde(rename = #lit)]));
        v.attrs = retained_attrs;
        variant_types.push((v.ident.clone(), lit));
    }

    let enum_ident = &enum_item.ident;
    let (impl_generics, ty_generics, where_clause) = enum_item.generics.split_for_impl();

    let type_lits = variant_types.iter().map(|(_, lit)| lit);
    let type_match_arms = variant_types.iter().map(|(v_ident, lit)| {
        quote! { Self::#v_ident { .. } => #lit }
    });

    let out = quote! {
        #enum_item

        impl #impl_generics ::es_domain::domain_event::DomainEvent for #enum_ident #ty_generics #where_clause {
            const EVENT_TYPES: &'static [&'static str] = &[ #( #type_lits ),* ];

            fn event_type(&self) -> &'static str {
                match self { #( #type_match_arms, )* }
            }
        }
    };

    TokenStream::from(out)
}

// -------- parsing --------

// 解析变体级 #[event(event_type = "...")]
fn parse_variant_event_attr(attr: &syn::Attribute) -> Result<Option<syn::LitStr>> {
    match &attr.meta {
        syn::Meta::List(_) => {
            let kvs = attr.parse_args_with(parse_kvs)?;
            let mut ty: Option<syn::LitStr> = None;
            for kv in kvs {
                match kv.key.to_string().as_str() {
                    "event_type" => {
                        if ty.is_some() {
                            return Err(duplicate_key(&kv));
                        }
                        ty = Some(expect_str(&kv)?);
                    }
                    _ => {
                        return Err(syn::Error::new(
                            kv.key.span(),
                            "unknown key; expected 'event_type'",
                        ));
                    }
                }
            }
            Ok(ty)
        }
        other => Err(syn::Error::new(other.span(), "expected #[event(...)]")),
    }
}
