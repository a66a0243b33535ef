//! es-macros：为 es-domain 生成样板代码的属性宏
//!
//! - `#[entity]`：注入聚合根状态并实现 `Entity`
//! - `#[domain_event]`：为事件枚举生成判别名与序列化标签
//! - `#[entity_id]`：单字段标识包装类型
//! - `#[value_object]`：值对象派生集合

mod domain_event;
mod entity;
mod entity_id;
mod utils;
mod value_object;

use proc_macro::TokenStream;

/// 聚合实体宏
/// 用法：`#[entity(event = PersonEvent, aggregate_type = "Person")]`
#[proc_macro_attribute]
pub fn entity(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity::expand(attr, item)
}

/// 领域事件枚举宏
#[proc_macro_attribute]
pub fn domain_event(attr: TokenStream, item: TokenStream) -> TokenStream {
    domain_event::expand(attr, item)
}

#[proc_macro_attribute]
pub fn entity_id(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity_id::expand(attr, item)
}

#[proc_macro_attribute]
pub fn value_object(attr: TokenStream, item: TokenStream) -> TokenStream {
    value_object::expand(attr, item)
}
