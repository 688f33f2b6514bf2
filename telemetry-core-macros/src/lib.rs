//! Derive macros for `telemetry-core`'s `MeterGroup` and `Aggregate`
//! traits, standing in for the runtime reflection this crate's origin
//! used to walk a struct's fields: here the walk happens once, at compile
//! time, and expands to ordinary field-by-field code.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, GenericArgument, PathArguments, Type};

/// Derives `telemetry_core::MeterGroup` for a struct whose fields are each
/// either `Arc<M>` for some meter type `M: Meter + Default`, or another
/// type that itself derives `MeterGroup`.
///
/// `load` registers one meter (or nested group) per field, under the
/// group's prefix joined with the field's name. `unload` removes
/// everything `load` would have registered.
#[proc_macro_derive(MeterGroup)]
pub fn derive_meter_group(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let fields = match named_fields(&input) {
        Ok(fields) => fields,
        Err(err) => return err.to_compile_error().into(),
    };

    let mut load_fields = Vec::new();
    let mut unload_calls = Vec::new();

    for field in fields {
        let ident = field.ident.as_ref().expect("checked by named_fields");
        let name_lit = ident.to_string();

        if let Some(inner) = arc_inner_type(&field.ty) {
            load_fields.push(quote! {
                #ident: ::telemetry_core::get_or_add_typed::<#inner>(
                    poller,
                    ::telemetry_core::group_path(prefix, #name_lit),
                )
            });
            unload_calls.push(quote! {
                poller.remove(&::telemetry_core::group_path(prefix, #name_lit));
            });
        } else {
            let ty = &field.ty;
            load_fields.push(quote! {
                #ident: <#ty as ::telemetry_core::MeterGroup>::load(
                    poller,
                    &::telemetry_core::group_path(prefix, #name_lit),
                )
            });
            unload_calls.push(quote! {
                <#ty as ::telemetry_core::MeterGroup>::unload(
                    poller,
                    &::telemetry_core::group_path(prefix, #name_lit),
                );
            });
        }
    }

    let expanded = quote! {
        impl ::telemetry_core::MeterGroup for #name {
            fn load(poller: &::telemetry_core::Poller, prefix: &str) -> Self {
                Self {
                    #(#load_fields),*
                }
            }

            fn unload(poller: &::telemetry_core::Poller, prefix: &str) {
                #(#unload_calls)*
            }
        }
    };

    expanded.into()
}

/// Derives `telemetry_core::Aggregate` for a struct whose fields each
/// implement `Aggregate` already, either as one of the built-in leaf
/// impls (`bool`, integers, `f32`/`f64`, `String`, `Duration`,
/// `HashMap<String, String>`) or by deriving `Aggregate` themselves.
///
/// Every field is recorded under the struct's prefix joined with the
/// field's name.
#[proc_macro_derive(Aggregate)]
pub fn derive_aggregate(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let fields = match named_fields(&input) {
        Ok(fields) => fields,
        Err(err) => return err.to_compile_error().into(),
    };

    let calls: Vec<TokenStream2> = fields
        .iter()
        .map(|field| {
            let ident = field.ident.as_ref().expect("checked by named_fields");
            let name_lit = ident.to_string();
            quote! {
                self.#ident.aggregate(recorder, &::telemetry_core::join(prefix, #name_lit));
            }
        })
        .collect();

    let expanded = quote! {
        impl ::telemetry_core::Aggregate for #name {
            fn aggregate(&self, recorder: &::telemetry_core::StructRecorder, prefix: &str) {
                #(#calls)*
            }
        }
    };

    expanded.into()
}

fn named_fields(input: &DeriveInput) -> syn::Result<Vec<syn::Field>> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(fields.named.iter().cloned().collect()),
            _ => Err(syn::Error::new_spanned(&input.ident, "only structs with named fields are supported")),
        },
        _ => Err(syn::Error::new_spanned(&input.ident, "only structs are supported")),
    }
}

/// If `ty` is (syntactically) `Arc<Inner>` or `std::sync::Arc<Inner>`,
/// returns `Inner`. Field types are matched by their last path segment
/// rather than fully resolved, the same heuristic macros like `serde`
/// use for `Option<T>`: a derive macro has no type-checker to ask.
fn arc_inner_type(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Arc" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    })
}
