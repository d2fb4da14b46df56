//! Procedural macros for test-waiters
//!
//! This crate provides the `#[test_waiters::test]` attribute macro for async
//! tests that must not leave async work pending.
//!
//! # Example
//!
//! ```rust,ignore
//! use test_waiters::prelude::*;
//!
//! #[test_waiters::test]
//! async fn my_test(registry: WaiterRegistry) {
//!     let waiter = TestWaiter::new("save", &registry);
//!     let token = waiter.begin().unwrap();
//!     waiter.end_async(&token).unwrap();
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input, FnArg, Ident, ItemFn, Lit, Pat, ReturnType, Token, Type,
};

/// Configuration options for the test macro.
#[derive(Default)]
struct TestConfig {
    /// Whether to fail the test if waiters are still pending (default: true)
    settled: Option<bool>,
    /// Flavor for tokio runtime ("current_thread" or "multi_thread")
    flavor: Option<String>,
}

impl Parse for TestConfig {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut config = TestConfig::default();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "settled" => {
                    let lit: Lit = input.parse()?;
                    if let Lit::Bool(b) = lit {
                        config.settled = Some(b.value());
                    } else {
                        return Err(syn::Error::new(ident.span(), "`settled` expects a bool"));
                    }
                }
                "flavor" => {
                    let lit: Lit = input.parse()?;
                    if let Lit::Str(s) = lit {
                        config.flavor = Some(s.value());
                    } else {
                        return Err(syn::Error::new(ident.span(), "`flavor` expects a string"));
                    }
                }
                _ => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {ident}"),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(config)
    }
}

/// Determines if a function parameter is requesting a WaiterRegistry.
fn is_registry_param(arg: &FnArg) -> bool {
    if let FnArg::Typed(pat_type) = arg {
        if let Type::Path(type_path) = &*pat_type.ty {
            if let Some(segment) = type_path.path.segments.last() {
                return segment.ident == "WaiterRegistry";
            }
        }
    }
    false
}

/// Extracts the parameter pattern from a function argument.
fn get_param_pat(arg: &FnArg) -> Option<&Pat> {
    if let FnArg::Typed(pat_type) = arg {
        Some(&pat_type.pat)
    } else {
        None
    }
}

/// Test attribute macro for async tests that must settle.
///
/// The test runs on tokio. A parameter of type `WaiterRegistry` receives a
/// fresh registry of its own; when the body returns, every waiter in that
/// registry must be idle or the test panics with the pending report.
///
/// # Basic Usage
///
/// ```rust,ignore
/// use test_waiters::prelude::*;
///
/// #[test_waiters::test]
/// async fn test_save(registry: WaiterRegistry) {
///     let waiter = TestWaiter::new("save", &registry);
///     let fut = wait_for_future(waiter, async { 1 }, None).unwrap();
///     assert_eq!(fut.await.unwrap(), 1);
/// }
/// ```
///
/// # Configuration Options
///
/// - `settled = false` - Don't check for pending waiters at the end
/// - `flavor = "multi_thread"` - Tokio runtime flavor
///
/// ```rust,ignore
/// #[test_waiters::test(settled = false, flavor = "multi_thread")]
/// async fn test_leaks(registry: WaiterRegistry) {
///     TestWaiter::new("leak", &registry).begin().unwrap();
/// }
/// ```
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = parse_macro_input!(attr as TestConfig);
    let input = parse_macro_input!(item as ItemFn);

    expand_test(config, input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_test(config: TestConfig, input: ItemFn) -> syn::Result<TokenStream2> {
    let name = &input.sig.ident;
    let body = &input.block;
    let attrs = &input.attrs;
    let vis = &input.vis;
    let output = &input.sig.output;

    // Check if function is async
    if input.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            &input.sig,
            "test function must be async",
        ));
    }

    let mut registry_pat = None;
    for arg in &input.sig.inputs {
        if is_registry_param(arg) && registry_pat.is_none() {
            registry_pat = get_param_pat(arg);
        } else {
            return Err(syn::Error::new_spanned(
                arg,
                "only a single `WaiterRegistry` parameter is supported",
            ));
        }
    }

    let registry_init = match registry_pat {
        Some(pat) => quote! {
            let #pat = __test_waiters_registry.clone();
        },
        None => quote! {},
    };

    let settled_check = if config.settled.unwrap_or(true) {
        quote! {
            let __test_waiters_state = __test_waiters_registry.pending_waiter_state();
            if __test_waiters_state.is_pending() {
                __test_waiters_registry.reset();
                panic!("test finished with pending waiters: {}", __test_waiters_state);
            }
        }
    } else {
        quote! {}
    };

    let output_ty = match output {
        ReturnType::Default => quote! { () },
        ReturnType::Type(_, ty) => quote! { #ty },
    };

    let flavor = config.flavor.as_deref().unwrap_or("current_thread");
    let flavor_attr = match flavor {
        "multi_thread" => quote! { #[::tokio::test(flavor = "multi_thread")] },
        "current_thread" => quote! { #[::tokio::test] },
        _ => {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                format!("unsupported flavor: {flavor}. Use \"current_thread\" or \"multi_thread\""),
            ));
        }
    };

    Ok(quote! {
        #flavor_attr
        #(#attrs)*
        #vis async fn #name() #output {
            let __test_waiters_registry = ::test_waiters::WaiterRegistry::new();
            #registry_init
            let __test_waiters_output: #output_ty = async move #body.await;
            #settled_check
            __test_waiters_registry.reset();
            __test_waiters_output
        }
    })
}
