//! Derive macro for mapping decoded rows onto Rust structs.
//!
//! This crate provides `#[derive(Row)]`, implementing
//! `sqlkit_core::schema::Row` for a struct with named fields: the
//! compile-time trait implementation spec.md §9's design note names as
//! the systems replacement for the source's struct-field reflection.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Expr, Fields, GenericArgument, Ident, Lit, Meta, PathArguments,
    Type, parse_macro_input,
};

/// Derives `sqlkit_core::schema::Row`, generating `FIELD_NAMES`,
/// `FIELD_TYPE_TAGS`, `FIELD_NULLABLE`, and `from_positional`.
///
/// # Field attributes
///
/// - `#[row(column = "name")]` — overrides the column looked up for this
///   field (defaults to the field's own name).
/// - `#[row(type = "uuid")]` — overrides the codec type tag (defaults to
///   an inference from the field's Rust type: integer types → `int`,
///   `f32`/`f64` → `float`, `bool` → `bool`, `String` → `text`,
///   `Vec<u8>` → `blob`). Required for tags the inference can't reach
///   (`date`, `datetime`, `uuid`, `json`), since those all decode to
///   `WireValue::Text` and are otherwise indistinguishable from `text`.
///
/// `Option<T>` fields are nullable; the tag is inferred from `T`.
#[proc_macro_derive(Row, attributes(row))]
pub fn derive_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_row_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

struct FieldInfo {
    field_ident: Ident,
    field_type: Type,
    column_name: String,
    nullable: bool,
    type_tag: String,
}

fn derive_row_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Row derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(&input, "Row derive only supports structs"));
        }
    };

    let mut infos = Vec::new();
    for field in fields {
        let field_ident = field.ident.clone().unwrap();
        let field_attrs = parse_row_attrs(&field.attrs)?;
        let (inner_type, option_wrapped) = unwrap_option(&field.ty);
        let nullable = field_attrs.nullable || option_wrapped;
        let type_tag = match field_attrs.type_tag {
            Some(tag) => tag,
            None => infer_type_tag(inner_type).ok_or_else(|| {
                syn::Error::new_spanned(
                    &field.ty,
                    "cannot infer a codec type tag for this field; add #[row(type = \"...\")]",
                )
            })?,
        };
        infos.push(FieldInfo {
            field_ident,
            field_type: field.ty.clone(),
            column_name: field_attrs.column.unwrap_or_else(|| field.ident.as_ref().unwrap().to_string()),
            nullable,
            type_tag,
        });
    }

    let field_names: Vec<&str> = infos.iter().map(|f| f.column_name.as_str()).collect();
    let field_tags: Vec<&str> = infos.iter().map(|f| f.type_tag.as_str()).collect();
    let field_nullable: Vec<bool> = infos.iter().map(|f| f.nullable).collect();

    let field_bindings: Vec<TokenStream2> = infos
        .iter()
        .map(|info| {
            let ident = &info.field_ident;
            let ty = &info.field_type;
            let column_name = &info.column_name;
            let convert = conversion_expr(&info.type_tag, info.nullable, ty, "__value");
            quote! {
                let #ident: #ty = {
                    let __value = __values_iter.next().ok_or_else(|| {
                        sqlkit_core::error::DecodeError::ConstructorRejected {
                            reason: ::std::format!("missing decoded value for field `{}`", #column_name),
                        }
                    })?;
                    #convert
                };
            }
        })
        .collect();

    let field_idents: Vec<&Ident> = infos.iter().map(|f| &f.field_ident).collect();

    let expanded = quote! {
        impl sqlkit_core::schema::Row for #struct_name {
            const FIELD_NAMES: &'static [&'static str] = &[#(#field_names),*];
            const FIELD_TYPE_TAGS: &'static [&'static str] = &[#(#field_tags),*];
            const FIELD_NULLABLE: &'static [bool] = &[#(#field_nullable),*];

            fn from_positional(
                values: ::std::vec::Vec<sqlkit_core::codec::WireValue>,
            ) -> ::std::result::Result<Self, sqlkit_core::error::DecodeError> {
                let mut __values_iter = values.into_iter();
                #(#field_bindings)*
                ::std::result::Result::Ok(Self { #(#field_idents),* })
            }
        }
    };

    Ok(expanded)
}

struct RowAttrs {
    column: Option<String>,
    type_tag: Option<String>,
    nullable: bool,
}

fn parse_row_attrs(attrs: &[Attribute]) -> syn::Result<RowAttrs> {
    let mut result = RowAttrs {
        column: None,
        type_tag: None,
        nullable: false,
    };

    for attr in attrs {
        if !attr.path().is_ident("row") {
            continue;
        }
        if matches!(attr.meta, Meta::Path(_)) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("column") {
                let value: Expr = meta.value()?.parse()?;
                if let Expr::Lit(lit) = value {
                    if let Lit::Str(s) = lit.lit {
                        result.column = Some(s.value());
                    }
                }
            } else if meta.path.is_ident("type") {
                let value: Expr = meta.value()?.parse()?;
                if let Expr::Lit(lit) = value {
                    if let Lit::Str(s) = lit.lit {
                        result.type_tag = Some(s.value());
                    }
                }
            } else if meta.path.is_ident("nullable") {
                result.nullable = true;
            }
            Ok(())
        })?;
    }

    Ok(result)
}

/// Returns `(inner_type, true)` for `Option<inner_type>`, else
/// `(original_type, false)`.
fn unwrap_option(ty: &Type) -> (&Type, bool) {
    if let Type::Path(path) = ty {
        if let Some(segment) = path.path.segments.last() {
            if segment.ident == "Option" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(inner)) = args.args.first() {
                        return (inner, true);
                    }
                }
            }
        }
    }
    (ty, false)
}

fn type_last_ident(ty: &Type) -> Option<String> {
    if let Type::Path(path) = ty {
        path.path.segments.last().map(|s| s.ident.to_string())
    } else {
        None
    }
}

fn is_vec_u8(ty: &Type) -> bool {
    if let Type::Path(path) = ty {
        if let Some(segment) = path.path.segments.last() {
            if segment.ident == "Vec" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(inner)) = args.args.first() {
                        return type_last_ident(inner).as_deref() == Some("u8");
                    }
                }
            }
        }
    }
    false
}

fn infer_type_tag(ty: &Type) -> Option<String> {
    if is_vec_u8(ty) {
        return Some("blob".to_string());
    }
    match type_last_ident(ty)?.as_str() {
        "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64" | "isize" | "usize" => {
            Some("int".to_string())
        }
        "f32" | "f64" => Some("float".to_string()),
        "bool" => Some("bool".to_string()),
        "String" => Some("text".to_string()),
        _ => None,
    }
}

/// Builds the `Result<FieldType, DecodeError>`-valued expression (minus
/// the trailing `?`, added by the caller) that converts the `WireValue`
/// bound to `value_ident` into `field_type`.
fn conversion_expr(type_tag: &str, nullable: bool, field_type: &Type, value_ident: &str) -> TokenStream2 {
    let value = Ident::new(value_ident, proc_macro2::Span::call_site());
    let (inner_type, _) = unwrap_option(field_type);

    let base = base_conversion(type_tag, inner_type, &value);

    if nullable {
        quote! {
            match #value {
                sqlkit_core::codec::WireValue::Null => ::std::option::Option::None,
                #value => ::std::option::Option::Some(#base?),
            }
        }
    } else {
        quote! { #base? }
    }
}

fn base_conversion(type_tag: &str, inner_type: &Type, value: &Ident) -> TokenStream2 {
    let mismatch = |kind: &str| -> TokenStream2 {
        quote! {
            ::std::result::Result::Err(sqlkit_core::error::DecodeError::ConstructorRejected {
                reason: ::std::format!("expected a {} value, got {:?}", #kind, #value),
            })
        }
    };

    match type_tag {
        "int" => {
            let err = mismatch("int");
            quote! {
                match #value {
                    sqlkit_core::codec::WireValue::Int(__n) => ::std::result::Result::Ok(__n as #inner_type),
                    __other => { let #value = __other; #err }
                }
            }
        }
        "float" => {
            let err = mismatch("float");
            quote! {
                match #value {
                    sqlkit_core::codec::WireValue::Float(__f) => ::std::result::Result::Ok(__f as #inner_type),
                    sqlkit_core::codec::WireValue::Int(__n) => ::std::result::Result::Ok(__n as #inner_type),
                    __other => { let #value = __other; #err }
                }
            }
        }
        "bool" => {
            let err = mismatch("bool");
            quote! {
                match #value {
                    sqlkit_core::codec::WireValue::Bool(__b) => ::std::result::Result::Ok(__b),
                    __other => { let #value = __other; #err }
                }
            }
        }
        "blob" => {
            let err = mismatch("blob");
            quote! {
                match #value {
                    sqlkit_core::codec::WireValue::Blob(__b) => ::std::result::Result::Ok(__b),
                    __other => { let #value = __other; #err }
                }
            }
        }
        // "text"/"date"/"datetime"/"uuid"/"json" all decode to WireValue::Text.
        _ => {
            let err = mismatch("text");
            quote! {
                match #value {
                    sqlkit_core::codec::WireValue::Text(__s) => ::std::result::Result::Ok(__s),
                    __other => { let #value = __other; #err }
                }
            }
        }
    }
}
