//! pagekit Derive Macros: Declarative Element Objects
//!
//! `#[derive(Element)]` turns a struct annotated with `#[element(...)]`
//! attributes into an `ElementDefinition` implementation, so the root
//! locator and named inner elements live next to the type instead of in a
//! hand-written trait impl.
//!
//! # Attributes
//!
//! - `locator = "..."`: CSS root locator (defaults to `body`)
//! - `<engine>(name = "pattern", ...)`: inner elements keyed on a selector
//!   engine. `css(...)` entries are composed below the root locator, every
//!   other engine (`xpath`, `named`, ...) is kept as declared.
//!
//! # Example
//!
//! ```ignore
//! use pagekit::Element;
//!
//! #[derive(Element, Default)]
//! #[element(locator = "#cart")]
//! #[element(css(total = ".total", item = "li[data-sku='%sku%']"))]
//! #[element(xpath(heading = "//h2[text()='%title%']"))]
//! struct Cart;
//!
//! let cart = pagekit::Element::new(session, &Cart);
//! cart.get_element("item", &pagekit::params! { "%sku%" => "A-1" })?;
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, DeriveInput, LitStr};

const CSS_ENGINE: &str = "css";

/// Derive macro for element object definitions.
///
/// Generates `::pagekit::ElementDefinition` with `locator()` and
/// `inner_elements()` built from the `#[element(...)]` attributes. Inner
/// elements keep their declaration order.
#[proc_macro_derive(Element, attributes(element))]
pub fn derive_element(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_element(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

// ============================================================================
// Attribute Parsing
// ============================================================================

/// One declared inner element
#[derive(Debug, Clone, PartialEq, Eq)]
struct InnerElement {
    name: String,
    engine: String,
    pattern: String,
}

/// Everything collected from the `#[element(...)]` attributes
#[derive(Debug, Default)]
struct ElementAttributes {
    locator: Option<LitStr>,
    elements: Vec<InnerElement>,
}

impl ElementAttributes {
    fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("element")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("locator") {
                    let locator: LitStr = meta.value()?.parse()?;
                    if locator.value().trim().is_empty() {
                        return Err(syn::Error::new(locator.span(), "locator must not be empty"));
                    }
                    if parsed.locator.is_some() {
                        return Err(meta.error("locator is declared more than once"));
                    }
                    parsed.locator = Some(locator);
                    return Ok(());
                }

                let engine = meta
                    .path
                    .get_ident()
                    .map(ToString::to_string)
                    .ok_or_else(|| meta.error("expected `locator = \"...\"` or an engine list such as `css(name = \"...\")`"))?;
                meta.parse_nested_meta(|inner| {
                    let name = inner
                        .path
                        .get_ident()
                        .map(ToString::to_string)
                        .ok_or_else(|| inner.error("element names must be plain identifiers"))?;
                    let pattern: LitStr = inner.value()?.parse()?;
                    if parsed.elements.iter().any(|e| e.name == name) {
                        return Err(inner.error(format!("element `{name}` is declared more than once")));
                    }
                    parsed.elements.push(InnerElement {
                        name,
                        engine: engine.clone(),
                        pattern: pattern.value(),
                    });
                    Ok(())
                })
            })?;
        }
        Ok(parsed)
    }
}

// ============================================================================
// Code Generation
// ============================================================================

fn expand_element(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let attributes = ElementAttributes::from_attrs(&input.attrs)?;

    let locator_fn = attributes.locator.as_ref().map(|locator| {
        quote! {
            fn locator(&self) -> &str {
                #locator
            }
        }
    });

    let inner_fn = if attributes.elements.is_empty() {
        None
    } else {
        let entries = attributes.elements.iter().map(inner_element_tokens);
        Some(quote! {
            fn inner_elements(&self) -> ::std::vec::Vec<(::std::string::String, ::pagekit::Locator)> {
                ::std::vec![#(#entries),*]
            }
        })
    };

    Ok(quote! {
        impl #impl_generics ::pagekit::ElementDefinition for #name #ty_generics #where_clause {
            #locator_fn
            #inner_fn
        }
    })
}

fn inner_element_tokens(element: &InnerElement) -> TokenStream2 {
    let InnerElement {
        name,
        engine,
        pattern,
    } = element;
    let locator = if engine == CSS_ENGINE {
        quote! { ::pagekit::Locator::css(#pattern) }
    } else {
        quote! { ::pagekit::Locator::engine(#engine, #pattern) }
    };
    quote! { (::std::string::String::from(#name), #locator) }
}
