use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DeriveInput, Fields, Lit, Meta};

/// Derive macro that generates a companion `*History` struct holding one
/// `Vec<f64>` per field, used as a node's per-timestep output buffer.
/// All fields in the source struct must be `f64`.
///
/// The generated history struct gets `with_capacity`, `push`, `len`,
/// `is_empty`, `clear`, `series` (lookup of a column by field name) and
/// `record` (reassemble the flux record of one timestep). The source struct
/// gains a `field_names()` associated function.
///
/// Use `#[fluxes(history_name = "CustomName")]` to override the default
/// history struct name (`{StructName}History`).
#[proc_macro_derive(Fluxes, attributes(fluxes))]
pub fn derive_fluxes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = &input.ident;

    let history_name =
        extract_history_name(&input).unwrap_or_else(|| format_ident!("{}History", name));

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return syn::Error::new_spanned(
                    name,
                    "Fluxes can only be derived for structs with named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new_spanned(name, "Fluxes can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    if fields.is_empty() {
        return syn::Error::new_spanned(name, "Fluxes struct must have at least one field")
            .to_compile_error()
            .into();
    }

    let mut field_names = Vec::new();
    let mut field_idents = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        if !is_f64_type(&field.ty) {
            return syn::Error::new_spanned(&field.ty, "Fluxes derive: all fields must be f64")
                .to_compile_error()
                .into();
        }
        field_names.push(ident.to_string());
        field_idents.push(ident);
    }

    let first_field = &field_idents[0];
    let field_name_strs: Vec<&str> = field_names.iter().map(|s| s.as_str()).collect();

    let history_fields = field_idents.iter().map(|f| quote! { pub #f: Vec<f64> });
    let with_cap_fields = field_idents
        .iter()
        .map(|f| quote! { #f: Vec::with_capacity(n) });
    let push_fields = field_idents.iter().map(|f| quote! { self.#f.push(f.#f); });
    let clear_fields = field_idents.iter().map(|f| quote! { self.#f.clear(); });
    let series_arms = field_idents
        .iter()
        .zip(&field_name_strs)
        .map(|(f, s)| quote! { #s => Some(self.#f.as_slice()), });
    let record_fields = field_idents.iter().map(|f| quote! { #f: self.#f[t] });

    let expanded = quote! {
        /// Auto-generated per-timestep history of flux records.
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct #history_name {
            #(#history_fields,)*
        }

        impl #history_name {
            /// Pre-allocate all columns for `n` timesteps.
            pub fn with_capacity(n: usize) -> Self {
                Self {
                    #(#with_cap_fields,)*
                }
            }

            /// Append a single timestep's fluxes.
            pub fn push(&mut self, f: &#name) {
                #(#push_fields)*
            }

            /// Number of timesteps stored.
            pub fn len(&self) -> usize {
                self.#first_field.len()
            }

            /// Returns `true` if no timesteps have been stored.
            pub fn is_empty(&self) -> bool {
                self.#first_field.is_empty()
            }

            /// Drop all stored timesteps, keeping allocations.
            pub fn clear(&mut self) {
                #(#clear_fields)*
            }

            /// Column for the named flux, if it exists.
            pub fn series(&self, field: &str) -> Option<&[f64]> {
                match field {
                    #(#series_arms)*
                    _ => None,
                }
            }

            /// Flux record stored at timestep `t`.
            pub fn record(&self, t: usize) -> Option<#name> {
                if t >= self.len() {
                    return None;
                }
                Some(#name {
                    #(#record_fields,)*
                })
            }
        }

        impl #name {
            /// Returns the field names of this flux struct.
            pub fn field_names() -> &'static [&'static str] {
                &[#(#field_name_strs),*]
            }
        }
    };

    expanded.into()
}

fn extract_history_name(input: &DeriveInput) -> Option<proc_macro2::Ident> {
    for attr in &input.attrs {
        if !attr.path().is_ident("fluxes") {
            continue;
        }
        let nested = attr
            .parse_args_with(
                syn::punctuated::Punctuated::<syn::Meta, syn::Token![,]>::parse_terminated,
            )
            .ok()?;
        for meta in nested {
            let Meta::NameValue(nv) = meta else {
                continue;
            };
            if !nv.path.is_ident("history_name") {
                continue;
            }
            if let syn::Expr::Lit(expr_lit) = &nv.value {
                if let Lit::Str(lit_str) = &expr_lit.lit {
                    return Some(format_ident!("{}", lit_str.value()));
                }
            }
        }
    }
    None
}

fn is_f64_type(ty: &syn::Type) -> bool {
    if let syn::Type::Path(type_path) = ty {
        type_path.path.is_ident("f64")
    } else {
        false
    }
}
