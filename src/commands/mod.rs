//! Command catalog: categories of tools, each holding command templates

pub mod catalog;
pub mod template;
