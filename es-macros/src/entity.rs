use crate::utils::{apply_derives, expect_bool, expect_str, has_field_named, prepend_field, reject_derives, AttrKv};
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Item, Result, Token, Type, parse::Parse, parse::ParseStream, parse_macro_input};

/// #[entity] 宏实现
/// - 在字段最前插入 `root: AggregateRoot<Event>`（标识、版本、软删除与待提交变更）
/// - 合并派生：Debug, Clone
/// - 实现 `::es_domain::entity::Entity`（TYPE/Event/root/root_mut/construct）
/// - 以聚合类型 + 标识实现 PartialEq/Eq/Hash
/// - 参数：`#[entity(event = EventType, aggregate_type = "...", constructor = true|false)]`
///   - `aggregate_type` 默认为结构体名
///   - `constructor = false` 时不生成仅含标识的构造函数，重建时返回 MissingConstructor
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EntityAttrConfig);
    let input = parse_macro_input!(item as Item);

    let mut st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[entity] only on struct")
                .to_compile_error()
                .into();
        }
    };

    if let Err(err) = reject_derives(&st.attrs, &["PartialEq", "Eq", "Hash"]) {
        return err.to_compile_error().into();
    }

    let fields_named = match &mut st.fields {
        syn::Fields::Named(f) => f,
        _ => {
            return syn::Error::new(st.span(), "only supports named-field struct")
                .to_compile_error()
                .into();
        }
    };

    if has_field_named(fields_named, "root") {
        return syn::Error::new(
            fields_named.span(),
            "field `root` is reserved by #[entity]",
        )
        .to_compile_error()
        .into();
    }

    let Some(event_ty) = cfg.event_ty else {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "missing required key 'event', e.g. #[entity(event = UserEvent)]",
        )
        .to_compile_error()
        .into();
    };

    // 其余字段在构造时取默认值
    let other_fields: Vec<syn::Ident> = fields_named
        .named
        .iter()
        .filter_map(|f| f.ident.clone())
        .collect();

    prepend_field(
        fields_named,
        syn::parse_quote! { root: ::es_domain::aggregate_root::AggregateRoot<#event_ty> },
    );

    apply_derives(
        &mut st.attrs,
        vec![syn::parse_quote!(Debug), syn::parse_quote!(Clone)],
    );

    let ident = &st.ident;
    let type_lit = cfg
        .aggregate_type
        .unwrap_or_else(|| syn::LitStr::new(&ident.to_string(), ident.span()));
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();

    let construct_fn = if cfg.constructor.unwrap_or(true) {
        quote! {
            fn construct(
                id: ::es_domain::identity::AggregateId,
            ) -> ::es_domain::error::DomainResult<Self> {
                ::core::result::Result::Ok(Self {
                    root: ::es_domain::aggregate_root::AggregateRoot::new(id),
                    #( #other_fields: ::core::default::Default::default(), )*
                })
            }
        }
    } else {
        quote! {}
    };

    let expanded = quote! {
        #st

        impl #impl_generics ::es_domain::entity::Entity for #ident #ty_generics #where_clause {
            const TYPE: &'static str = #type_lit;

            type Event = #event_ty;

            fn root(&self) -> &::es_domain::aggregate_root::AggregateRoot<#event_ty> {
                &self.root
            }

            fn root_mut(&mut self) -> &mut ::es_domain::aggregate_root::AggregateRoot<#event_ty> {
                &mut self.root
            }

            #construct_fn
        }

        impl #impl_generics ::core::cmp::PartialEq for #ident #ty_generics #where_clause {
            fn eq(&self, other: &Self) -> bool {
                self.root.id() == other.root.id()
            }
        }

        impl #impl_generics ::core::cmp::Eq for #ident #ty_generics #where_clause {}

        impl #impl_generics ::core::hash::Hash for #ident #ty_generics #where_clause {
            fn hash<H: ::core::hash::Hasher>(&self, state: &mut H) {
                ::core::hash::Hash::hash(#type_lit, state);
                ::core::hash::Hash::hash(self.root.id(), state);
            }
        }
    };

    TokenStream::from(expanded)
}

// -------- parsing --------

struct EntityAttrConfig {
    event_ty: Option<Type>,
    aggregate_type: Option<syn::LitStr>,
    constructor: Option<bool>,
}

impl Parse for EntityAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut cfg = Self {
            event_ty: None,
            aggregate_type: None,
            constructor: None,
        };

        let elems = Punctuated::<EntityAttrElem, Token![,]>::parse_terminated(input)?;
        for elem in elems {
            match elem {
                EntityAttrElem::Event(ty) => {
                    if cfg.event_ty.is_some() {
                        return Err(syn::Error::new(
                            ty.span(),
                            "duplicate key 'event' in attribute",
                        ));
                    }
                    cfg.event_ty = Some(*ty);
                }
                EntityAttrElem::Other(kv) => match kv.key.to_string().as_str() {
                    "aggregate_type" => {
                        if cfg.aggregate_type.is_some() {
                            return Err(crate::utils::duplicate_key(&kv));
                        }
                        cfg.aggregate_type = Some(expect_str(&kv)?);
                    }
                    "constructor" => {
                        if cfg.constructor.is_some() {
                            return Err(crate::utils::duplicate_key(&kv));
                        }
                        cfg.constructor = Some(expect_bool(&kv)?);
                    }
                    _ => {
                        return Err(syn::Error::new(
                            kv.key.span(),
                            "unknown key; expected 'event' | 'aggregate_type' | 'constructor'",
                        ));
                    }
                },
            }
        }

        Ok(cfg)
    }
}

enum EntityAttrElem {
    Event(Box<Type>),
    Other(AttrKv),
}

impl Parse for EntityAttrElem {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.fork().parse::<syn::Ident>()? == "event" {
            let _key: syn::Ident = input.parse()?;
            let _eq: Token![=] = input.parse()?;
            let ty: Type = input.parse()?;
            Ok(EntityAttrElem::Event(Box::new(ty)))
        } else {
            Ok(EntityAttrElem::Other(input.parse()?))
        }
    }
}
