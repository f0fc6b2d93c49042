//! Registration attributes for fluxcase
//!
//! `#[fluxcase::method]` turns a free function into a `MethodDef` entry:
//! it strips the `#[case("...")]` markers below it, generates a binder that
//! converts parsed arguments with `FromArg`, and submits the definition to
//! the inventory registry.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{Attribute, FnArg, ItemFn, ReturnType, Type, parse_macro_input};

/// Register a method and the cases declared below it
///
/// # Example
///
/// ```ignore
/// #[fluxcase::method(tags = "loop")]
/// #[case("(5) -> ok")]
/// #[case("(0) -> assertion error")]
/// fn positive(x: i32) {
///     flux_assert!(x > 0);
/// }
///
/// // With configuration
/// #[fluxcase::method(class = "Strings", id = "strings.char_at")]
/// #[case("(\"hello\", 5) -> out of bounds")]
/// fn char_at(s: String, i: i32) -> char { ... }
/// ```
///
/// Parameters must implement `FromArg`. A non-unit return value is recorded
/// with its `Debug` rendering.
#[proc_macro_attribute]
pub fn method(args: TokenStream, item: TokenStream) -> TokenStream {
    let args = TokenStream2::from(args);
    let func = parse_macro_input!(item as ItemFn);

    method_impl(args, func)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Case marker. Only meaningful below `#[method]`, which consumes it.
#[proc_macro_attribute]
pub fn case(_args: TokenStream, item: TokenStream) -> TokenStream {
    let item = TokenStream2::from(item);
    let error = syn::Error::new(
        proc_macro2::Span::call_site(),
        "Fluxcase: `#[case]` must come after `#[fluxcase::method]`",
    )
    .to_compile_error();
    quote! { #error #item }.into()
}

fn method_impl(args: TokenStream2, mut func: ItemFn) -> Result<TokenStream2, syn::Error> {
    validate_signature(&func)?;

    let config = parse_method_config(args)?;
    let cases = take_cases(&mut func.attrs)?;

    let fn_name = &func.sig.ident;
    let fn_name_str = fn_name.to_string();
    let invoke_name = format_ident!("_flux_invoke_{}", fn_name);
    let params_name = format_ident!("_flux_params_{}", fn_name);

    let param_types: Vec<&Type> = func
        .sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Typed(pat) => Some(pat.ty.as_ref()),
            FnArg::Receiver(_) => None,
        })
        .collect();
    let arity = param_types.len();

    let bindings = param_types.iter().enumerate().map(|(i, ty)| {
        let var = format_ident!("__arg{}", i);
        quote! {
            let #var = <#ty as ::fluxcase::FromArg>::from_arg(&args[#i]).ok_or_else(|| {
                ::fluxcase::BindError::type_mismatch(
                    #i,
                    <#ty as ::fluxcase::FromArg>::param_type(),
                    &args[#i],
                )
            })?;
        }
    });
    let vars: Vec<_> = (0..arity).map(|i| format_ident!("__arg{}", i)).collect();

    let call = if returns_unit(&func.sig.output) {
        quote! {
            #fn_name(#(#vars),*);
            ::std::result::Result::Ok(::std::option::Option::None)
        }
    } else {
        quote! {
            let __value = #fn_name(#(#vars),*);
            ::std::result::Result::Ok(::std::option::Option::Some(::std::format!("{:?}", __value)))
        }
    };

    let id = match &config.id {
        Some(id) => quote! { #id },
        None => quote! { concat!(module_path!(), "::", #fn_name_str) },
    };
    let class = match &config.class {
        Some(class) => quote! { ::std::option::Option::Some(#class) },
        None => quote! { ::std::option::Option::None },
    };
    let tags = config.tags.iter().map(|tag| match tag {
        TagName::Loop => quote! { ::fluxcase::Tag::Loop },
        TagName::Recursive => quote! { ::fluxcase::Tag::Recursive },
    });

    Ok(quote! {
        #func

        #[doc(hidden)]
        #[allow(non_snake_case)]
        fn #params_name() -> ::std::vec::Vec<::fluxcase::ParamType> {
            ::std::vec![#(<#param_types as ::fluxcase::FromArg>::param_type()),*]
        }

        #[doc(hidden)]
        #[allow(non_snake_case)]
        fn #invoke_name(
            args: &[::fluxcase::ArgValue],
        ) -> ::std::result::Result<::std::option::Option<::std::string::String>, ::fluxcase::BindError> {
            if args.len() != #arity {
                return ::std::result::Result::Err(::fluxcase::BindError::Arity {
                    expected: #arity,
                    got: args.len(),
                });
            }
            #(#bindings)*
            #call
        }

        ::fluxcase::internal::inventory::submit! {
            ::fluxcase::MethodDef {
                id: #id,
                name: #fn_name_str,
                class: #class,
                tags: &[#(#tags),*],
                cases: &[#(#cases),*],
                params_fn: #params_name,
                invoke_fn: #invoke_name,
                file: file!(),
                line: line!(),
                module_path: module_path!(),
            }
        }
    })
}

fn validate_signature(func: &ItemFn) -> syn::Result<()> {
    let sig = &func.sig;
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "Fluxcase: methods must be synchronous",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "Fluxcase: methods cannot be generic",
        ));
    }
    for input in &sig.inputs {
        match input {
            FnArg::Receiver(recv) => {
                return Err(syn::Error::new_spanned(
                    recv,
                    "Fluxcase: methods must be free functions (no `self`)",
                ));
            }
            FnArg::Typed(pat) => {
                if matches!(pat.ty.as_ref(), Type::ImplTrait(_) | Type::Reference(_)) {
                    return Err(syn::Error::new_spanned(
                        &pat.ty,
                        "Fluxcase: parameters must be owned types implementing `FromArg`",
                    ));
                }
            }
        }
    }
    Ok(())
}

fn returns_unit(output: &ReturnType) -> bool {
    match output {
        ReturnType::Default => true,
        ReturnType::Type(_, ty) => matches!(ty.as_ref(), Type::Tuple(t) if t.elems.is_empty()),
    }
}

/// Remove every `#[case("...")]` from `attrs`, returning the literals in order.
fn take_cases(attrs: &mut Vec<Attribute>) -> syn::Result<Vec<syn::LitStr>> {
    let mut cases = Vec::new();
    let mut kept = Vec::with_capacity(attrs.len());
    for attr in attrs.drain(..) {
        let is_case = attr
            .path()
            .segments
            .last()
            .is_some_and(|seg| seg.ident == "case");
        if is_case {
            cases.push(attr.parse_args::<syn::LitStr>()?);
        } else {
            kept.push(attr);
        }
    }
    *attrs = kept;
    Ok(cases)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagName {
    Loop,
    Recursive,
}

impl TagName {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "loop" => Some(TagName::Loop),
            "recursive" => Some(TagName::Recursive),
            _ => None,
        }
    }
}

#[derive(Default)]
struct MethodConfig {
    id: Option<String>,
    class: Option<String>,
    tags: Vec<TagName>,
}

fn parse_method_config(args: TokenStream2) -> Result<MethodConfig, syn::Error> {
    let mut config = MethodConfig::default();
    if args.is_empty() {
        return Ok(config);
    }

    let parser = syn::meta::parser(|meta| {
        let value = || -> syn::Result<syn::LitStr> { meta.value()?.parse() };
        if meta.path.is_ident("id") {
            config.id = Some(value()?.value());
        } else if meta.path.is_ident("class") {
            config.class = Some(value()?.value());
        } else if meta.path.is_ident("tags") {
            let lit = value()?;
            for name in lit.value().split(',').map(str::trim).filter(|n| !n.is_empty()) {
                let tag = TagName::parse(name).ok_or_else(|| {
                    syn::Error::new_spanned(
                        &lit,
                        format!(
                            "Fluxcase: unknown tag `{}` (expected `loop` or `recursive`)",
                            name
                        ),
                    )
                })?;
                if !config.tags.contains(&tag) {
                    config.tags.push(tag);
                }
            }
        } else {
            return Err(meta.error("Fluxcase: expected `id`, `class` or `tags`"));
        }
        Ok(())
    });

    syn::parse::Parser::parse2(parser, args)?;
    Ok(config)
}
