use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Expr, Fields, LitStr};

/// Rules collected from one field's `#[validate(...)]` attributes.
#[derive(Default)]
struct FieldRules {
    required: bool,
    min: Option<Expr>,
    max: Option<Expr>,
    rename: Option<String>,
}

pub fn derive_validate(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Validate derive only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Validate derive only supports structs",
            ))
        }
    };

    let mut checks = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let rules = parse_field_rules(&field.attrs)?;
        let reported = rules
            .rename
            .clone()
            .or_else(|| serde_rename(&field.attrs))
            .unwrap_or_else(|| ident.to_string());

        if rules.required {
            checks.push(quote! {
                if !::dalgo_rust::Required::is_present(&self.#ident) {
                    return ::core::result::Result::Err(
                        ::dalgo_rust::ValidationError::missing_required_field(#reported),
                    );
                }
            });
        }
        if let Some(min) = &rules.min {
            checks.push(quote! {
                if self.#ident < #min {
                    return ::core::result::Result::Err(
                        ::dalgo_rust::ValidationError::bad_field_value(
                            #reported,
                            ::std::format!("should be >= {}, got: {}", #min, self.#ident),
                        ),
                    );
                }
            });
        }
        if let Some(max) = &rules.max {
            checks.push(quote! {
                if self.#ident > #max {
                    return ::core::result::Result::Err(
                        ::dalgo_rust::ValidationError::bad_field_value(
                            #reported,
                            ::std::format!("should be <= {}, got: {}", #max, self.#ident),
                        ),
                    );
                }
            });
        }
    }

    Ok(quote! {
        impl #impl_generics ::dalgo_rust::Validate for #name #ty_generics #where_clause {
            fn validate(&self) -> ::core::result::Result<(), ::dalgo_rust::ValidationError> {
                #(#checks)*
                ::core::result::Result::Ok(())
            }
        }
    })
}

fn parse_field_rules(attrs: &[Attribute]) -> syn::Result<FieldRules> {
    let mut rules = FieldRules::default();
    for attr in attrs {
        if !attr.path().is_ident("validate") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("required") {
                rules.required = true;
            } else if meta.path.is_ident("min") {
                rules.min = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("max") {
                rules.max = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                rules.rename = Some(value.value());
            } else {
                return Err(meta.error("expected `required`, `min`, `max` or `rename`"));
            }
            Ok(())
        })?;
    }
    Ok(rules)
}

/// `#[serde(rename = "...")]` on the field, so errors name the stored field.
fn serde_rename(attrs: &[Attribute]) -> Option<String> {
    let mut rename = None;
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                rename = Some(value.value());
            } else if let Ok(value) = meta.value() {
                // Skip the value of serde options we don't care about.
                let _: Expr = value.parse()?;
            }
            Ok(())
        });
    }
    rename
}
