use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Error, Fields, LitStr};

// derive_model
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    if !input.generics.params.is_empty() {
        let err = Error::new_spanned(&input.generics, "Model cannot be derived for generic types");
        return err.to_compile_error();
    }

    let fields = if let Data::Struct(data) = &input.data {
        if let Fields::Named(named) = &data.fields {
            &named.named
        } else {
            let err = Error::new_spanned(
                &data.fields,
                "Model can only be derived for structs with named fields",
            );
            return err.to_compile_error();
        }
    } else {
        let err = Error::new_spanned(
            &input.ident,
            "Model can only be derived for structs with named fields",
        );
        return err.to_compile_error();
    };

    let binding = match ModelBinding::from_attrs(&input) {
        Ok(binding) => binding,
        Err(err) => return err.to_compile_error(),
    };

    let ident = &input.ident;
    let vis = &input.vis;
    let model_name = ident.to_string();
    let fields_ident = format_ident!("{ident}Fields");

    let database = option_tokens(binding.database.as_deref());
    let collection = option_tokens(binding.collection.as_deref());

    let descriptor_members = fields.iter().map(|field| {
        let field_ident = field.ident.as_ref().expect("named field");
        quote! {
            pub #field_ident: ::docmapper::field::Field<#ident>,
        }
    });

    let descriptor_values = fields.iter().map(|field| {
        let field_ident = field.ident.as_ref().expect("named field");
        let field_name = field_ident.to_string();
        quote! {
            #field_ident: ::docmapper::field::Field::new(#field_name),
        }
    });

    quote! {
        impl ::docmapper::model::Model for #ident {
            fn database_name() -> Option<&'static str> {
                #database
            }

            fn collection_name() -> Option<&'static str> {
                #collection
            }

            fn model_name() -> &'static str {
                #model_name
            }
        }

        #[derive(Debug, Clone, Copy)]
        #vis struct #fields_ident {
            #(#descriptor_members)*
        }

        impl #ident {
            /// One typed descriptor per declared field.
            pub const FIELDS: #fields_ident = #fields_ident {
                #(#descriptor_values)*
            };
        }
    }
}

///
/// ModelBinding
///

struct ModelBinding {
    database: Option<String>,
    collection: Option<String>,
}

impl ModelBinding {
    fn from_attrs(input: &DeriveInput) -> syn::Result<Self> {
        let mut binding = Self {
            database: None,
            collection: None,
        };

        for attr in &input.attrs {
            if !attr.path().is_ident("model") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("database") {
                    let value: LitStr = meta.value()?.parse()?;
                    binding.database = Some(value.value());
                    return Ok(());
                }
                if meta.path.is_ident("collection") {
                    let value: LitStr = meta.value()?.parse()?;
                    binding.collection = Some(value.value());
                    return Ok(());
                }
                Err(meta.error("expected `database = \"...\"` or `collection = \"...\"`"))
            })?;
        }

        Ok(binding)
    }
}

fn option_tokens(value: Option<&str>) -> TokenStream {
    match value {
        Some(value) => quote! { Some(#value) },
        None => quote! { None },
    }
}
