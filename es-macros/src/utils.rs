use quote::ToTokens;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Attribute, Expr, Field, FieldsNamed, Ident, Token, parse::Parse, parse::ParseStream};

// 提取非 derive 属性与已有 derive 列表
pub(crate) fn split_derives(attrs: &[Attribute]) -> (Vec<Attribute>, Vec<syn::Path>) {
    let mut retained = Vec::new();
    let mut existing = Vec::new();
    for attr in attrs.iter() {
        if attr.path().is_ident("derive") {
            if let Ok(list) =
                attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated)
            {
                existing.extend(list);
            }
        } else {
            retained.push(attr.clone());
        }
    }
    (retained, existing)
}

// 合并默认与已有 derive（去重，优先保留 required）
pub(crate) fn merge_derives(existing: Vec<syn::Path>, required: Vec<syn::Path>) -> Attribute {
    let mut seen = std::collections::HashSet::<String>::new();
    let mut final_list: Vec<syn::Path> = Vec::new();
    for p in required.into_iter().chain(existing) {
        if seen.insert(derive_key(&p)) {
            final_list.push(p);
        }
    }
    syn::parse_quote!(#[derive(#(#final_list),*)])
}

// 归一化 derive 的 key，避免 Serialize/serde::Serialize 重复
pub(crate) fn derive_key(p: &syn::Path) -> String {
    if let Some(last) = p.segments.last() {
        let last_ident = last.ident.to_string();
        match last_ident.as_str() {
            "Serialize" | "Deserialize" => format!("serde::{}", last_ident),
            _ => last_ident,
        }
    } else {
        p.to_token_stream().to_string()
    }
}

// 直接在 attrs 上应用默认派生合并
pub(crate) fn apply_derives(attrs: &mut Vec<Attribute>, required: Vec<syn::Path>) {
    let (retained, existing) = split_derives(attrs);
    let merged = merge_derives(existing, required);
    *attrs = std::iter::once(merged).chain(retained).collect();
}

/// 若用户已手动派生了 `forbidden` 中的任一 trait，返回对应的编译错误
pub(crate) fn reject_derives(attrs: &[Attribute], forbidden: &[&str]) -> syn::Result<()> {
    let (_, existing) = split_derives(attrs);
    for p in existing {
        let key = derive_key(&p);
        if forbidden.contains(&key.as_str()) {
            return Err(syn::Error::new(
                p.span(),
                format!("`{key}` is generated by this attribute and must not be derived manually"),
            ));
        }
    }
    Ok(())
}

pub(crate) fn has_field_named(fields: &FieldsNamed, name: &str) -> bool {
    fields
        .named
        .iter()
        .any(|f| f.ident.as_ref().map(|i| i == name).unwrap_or(false))
}

/// 在具名字段的最前面插入一个字段
pub(crate) fn prepend_field(fields: &mut FieldsNamed, field: Field) {
    let mut new_named: Punctuated<Field, Token![,]> = Punctuated::new();
    new_named.push(field);
    for f in fields.named.clone().into_iter() {
        new_named.push(f);
    }
    fields.named = new_named;
}

/// 属性参数中的键值对：`key = value`
pub(crate) struct AttrKv {
    pub(crate) key: Ident,
    #[allow(dead_code)]
    pub(crate) eq: Token![=],
    pub(crate) value: Expr,
}

impl Parse for AttrKv {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        Ok(Self {
            key: input.parse()?,
            eq: input.parse()?,
            value: input.parse()?,
        })
    }
}

pub(crate) fn parse_kvs(input: ParseStream) -> syn::Result<Vec<AttrKv>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }
    let pairs = Punctuated::<AttrKv, Token![,]>::parse_terminated(input)?;
    Ok(pairs.into_iter().collect())
}

pub(crate) fn expect_bool(kv: &AttrKv) -> syn::Result<bool> {
    match &kv.value {
        Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Bool(b),
            ..
        }) => Ok(b.value()),
        other => Err(syn::Error::new(
            other.span(),
            format!("expected boolean literal for '{}'", kv.key),
        )),
    }
}

pub(crate) fn expect_str(kv: &AttrKv) -> syn::Result<syn::LitStr> {
    match &kv.value {
        Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(s),
            ..
        }) => Ok(s.clone()),
        other => Err(syn::Error::new(
            other.span(),
            format!("expected string literal for '{}'", kv.key),
        )),
    }
}

pub(crate) fn duplicate_key(kv: &AttrKv) -> syn::Error {
    syn::Error::new(
        kv.key.span(),
        format!("duplicate key '{}' in attribute", kv.key),
    )
}
