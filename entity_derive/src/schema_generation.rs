//! Code generation for entity metadata
//!
//! Emits the `EntitySchema` implementation from parsed table and field metadata.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Generics, Ident};

use crate::parsing::{FieldInfo, TableInfo};

pub fn generate_entity_schema_impl(
    name: &Ident,
    generics: &Generics,
    table_info: &TableInfo,
    field_info: &FieldInfo,
) -> TokenStream {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let table_name = &table_info.name;
    let primary_key = &field_info.primary_key;
    let identifiers = &field_info.identifiers;
    let columns = &field_info.columns;

    quote! {
        impl #impl_generics entity_store::EntitySchema for #name #ty_generics #where_clause {
            fn table_name() -> &'static str {
                #table_name
            }

            fn primary_key() -> &'static str {
                #primary_key
            }

            fn identifiers() -> &'static [&'static str] {
                &[#(#identifiers),*]
            }

            fn columns() -> &'static [&'static str] {
                &[#(#columns),*]
            }
        }
    }
}
