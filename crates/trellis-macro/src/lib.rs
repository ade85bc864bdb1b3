use std::collections::HashSet;

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{braced, bracketed, token, Ident, LitStr, Result, Token, Visibility};

use proc_macro_crate::{crate_name, FoundCrate};

mod kw {
    syn::custom_keyword!(root);
    syn::custom_keyword!(terminal);
}

/// A segment name: bare identifier or string literal (for names such as
/// `"by-id"` that are not identifiers).
struct Segment {
    value: String,
    span: Span,
}

impl Parse for Segment {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.peek(LitStr) {
            let lit: LitStr = input.parse()?;
            Ok(Self {
                value: lit.value(),
                span: lit.span(),
            })
        } else {
            let ident = input.call(Ident::parse_any)?;
            Ok(Self {
                value: ident.unraw().to_string(),
                span: ident.span(),
            })
        }
    }
}

/// `gallery | images => Gallery;`
struct AttachDecl {
    names: Vec<Segment>,
    child: Ident,
}

impl Parse for AttachDecl {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut names = vec![input.parse::<Segment>()?];
        while input.peek(Token![|]) {
            input.parse::<Token![|]>()?;
            names.push(input.parse()?);
        }
        input.parse::<Token![=>]>()?;
        let child: Ident = input.parse()?;
        input.parse::<Token![;]>()?;
        Ok(Self { names, child })
    }
}

/// `[root] [terminal] Name [req, ...] : Base => DynamicChild { attachments } | ;`
struct TypeDecl {
    is_root: bool,
    is_terminal: bool,
    name: Ident,
    requires: Vec<Segment>,
    extends: Option<Ident>,
    child: Option<Ident>,
    attachments: Vec<AttachDecl>,
}

impl Parse for TypeDecl {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut is_root = false;
        let mut is_terminal = false;

        // `root` / `terminal` are modifiers only when another identifier follows
        loop {
            if input.peek(kw::root) && input.peek2(Ident) {
                input.parse::<kw::root>()?;
                is_root = true;
            } else if input.peek(kw::terminal) && input.peek2(Ident) {
                input.parse::<kw::terminal>()?;
                is_terminal = true;
            } else {
                break;
            }
        }

        let name: Ident = input.parse()?;

        let requires = if input.peek(token::Bracket) {
            let content;
            bracketed!(content in input);
            let list: Punctuated<Segment, Token![,]> = content.parse_terminated(Segment::parse, Token![,])?;
            list.into_iter().collect()
        } else {
            Vec::new()
        };

        let extends = if input.peek(Token![:]) {
            input.parse::<Token![:]>()?;
            Some(input.parse()?)
        } else {
            None
        };

        let child = if input.peek(Token![=>]) {
            input.parse::<Token![=>]>()?;
            Some(input.parse()?)
        } else {
            None
        };

        let attachments = if input.peek(token::Brace) {
            let content;
            braced!(content in input);
            let mut attachments = Vec::new();
            while !content.is_empty() {
                attachments.push(content.parse()?);
            }
            attachments
        } else {
            input.parse::<Token![;]>()?;
            Vec::new()
        };

        Ok(Self {
            is_root,
            is_terminal,
            name,
            requires,
            extends,
            child,
            attachments,
        })
    }
}

struct TreeInput {
    vis: Visibility,
    module: Ident,
    types: Vec<TypeDecl>,
}

impl Parse for TreeInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let vis: Visibility = input.parse()?;
        input.parse::<Token![mod]>()?;
        let module: Ident = input.parse()?;
        let content;
        braced!(content in input);
        let mut types = Vec::new();
        while !content.is_empty() {
            types.push(content.parse()?);
        }
        Ok(Self { vis, module, types })
    }
}

// =============================================================================
// Validation (runs at macro expansion time)
// =============================================================================

/// Checks everything that can be known without running the declaration:
/// one root, unique type names, resolvable references, terminal shape and
/// per-type segment uniqueness. Returns the root type.
fn validate(input: &TreeInput) -> Result<&Ident> {
    let mut names = HashSet::new();
    for decl in &input.types {
        if !names.insert(decl.name.to_string()) {
            return Err(syn::Error::new(
                decl.name.span(),
                format!("node type '{}' is declared more than once", decl.name),
            ));
        }
    }

    let mut roots = input.types.iter().filter(|d| d.is_root);
    let root = match (roots.next(), roots.next()) {
        (Some(root), None) => root,
        (None, _) => {
            return Err(syn::Error::new(
                input.module.span(),
                "resource tree has no `root` node type",
            ));
        }
        (Some(_), Some(second)) => {
            return Err(syn::Error::new(
                second.name.span(),
                "resource tree declares more than one `root` node type",
            ));
        }
    };
    if root.is_terminal {
        return Err(syn::Error::new(root.name.span(), "the root node type cannot be terminal"));
    }

    let check_ref = |ident: &Ident| -> Result<()> {
        if names.contains(&ident.to_string()) {
            Ok(())
        } else {
            Err(syn::Error::new(
                ident.span(),
                format!("node type '{}' is not declared in this tree", ident),
            ))
        }
    };

    for decl in &input.types {
        if decl.is_terminal {
            let offending = decl
                .attachments
                .first()
                .map(|a| (a.child.span(), "attachments"))
                .or(decl.child.as_ref().map(|c| (c.span(), "a dynamic child")))
                .or(decl.extends.as_ref().map(|e| (e.span(), "a base type")));
            if let Some((span, what)) = offending {
                return Err(syn::Error::new(
                    span,
                    format!("terminal node type '{}' cannot have {}", decl.name, what),
                ));
            }
        }

        let mut segments = HashSet::new();
        for attach in &decl.attachments {
            check_ref(&attach.child)?;
            for seg in &attach.names {
                if seg.value.is_empty() {
                    return Err(syn::Error::new(seg.span, "segment names must not be empty"));
                }
                if !segments.insert(seg.value.as_str()) {
                    return Err(syn::Error::new(
                        seg.span,
                        format!("segment '{}' is already attached to '{}'", seg.value, decl.name),
                    ));
                }
            }
        }
        if let Some(child) = &decl.child {
            check_ref(child)?;
        }
        if let Some(base) = &decl.extends {
            check_ref(base)?;
        }
    }

    Ok(&root.name)
}

// =============================================================================
// Crate path resolution
// =============================================================================

fn trellis_crate_path() -> TokenStream2 {
    match crate_name("trellis") {
        Ok(FoundCrate::Itself) => {
            quote!(::trellis)
        }
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Err(_) => quote!(::trellis),
    }
}

// =============================================================================
// Code generation
// =============================================================================

/// One `TypeDef` builder expression per declared type.
///
/// ```ignore
/// ::trellis::TypeDef::branch("User")
///     .requires(["user"])
///     .attach_aliased("gallery", "Gallery", ["images"])
/// ```
fn generate_type_def(decl: &TypeDecl, krate: &TokenStream2) -> TokenStream2 {
    let name = LitStr::new(&decl.name.to_string(), decl.name.span());
    let ctor = if decl.is_terminal {
        quote!(terminal)
    } else {
        quote!(branch)
    };

    let requires = if decl.requires.is_empty() {
        quote!()
    } else {
        let keys = decl.requires.iter().map(|s| LitStr::new(&s.value, s.span));
        quote!(.requires([#(#keys),*]))
    };

    let attachments = decl.attachments.iter().map(|attach| {
        let primary = &attach.names[0];
        let primary = LitStr::new(&primary.value, primary.span);
        let child = LitStr::new(&attach.child.to_string(), attach.child.span());
        if attach.names.len() == 1 {
            quote!(.attach(#primary, #child))
        } else {
            let aliases = attach.names[1..].iter().map(|s| LitStr::new(&s.value, s.span));
            quote!(.attach_aliased(#primary, #child, [#(#aliases),*]))
        }
    });

    let child = decl.child.as_ref().map(|c| {
        let c = LitStr::new(&c.to_string(), c.span());
        quote!(.child(#c))
    });

    let extends = decl.extends.as_ref().map(|e| {
        let e = LitStr::new(&e.to_string(), e.span());
        quote!(.extends(#e))
    });

    quote! {
        #krate::TypeDef::#ctor(#name) #requires #(#attachments)* #child #extends
    }
}

/// `pub const Users: &str = "Users";` per type, for binding loaders by name.
fn generate_type_consts(types: &[TypeDecl]) -> Vec<TokenStream2> {
    types
        .iter()
        .map(|decl| {
            let ident = &decl.name;
            let name = LitStr::new(&ident.to_string(), ident.span());
            quote! {
                #[doc = concat!("Node type name `", #name, "`.")]
                pub const #ident: &str = #name;
            }
        })
        .collect()
}

// =============================================================================
// Entry point
// =============================================================================

/// Declare a resource tree.
///
/// ```ignore
/// resource_tree! {
///     pub mod shop {
///         root Root [request] {
///             users => Users;
///             gallery | images => Gallery;
///         }
///         Users => User;                 // data-backed children of type User
///         User [user] : Profile {        // requires `user`, inherits Profile
///             gallery | images => Gallery;
///         }
///         Profile { "by-id" => Gallery; }
///         terminal Gallery;
///     }
/// }
///
/// let mut builder = shop::builder()?;
/// builder.bind_loader_named(shop::types::Users, load_user)?;
/// let schema = builder.build()?;
/// ```
#[proc_macro]
pub fn resource_tree(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as TreeInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &TreeInput) -> Result<TokenStream2> {
    let root = validate(input)?;
    let krate = trellis_crate_path();

    let root_lit = LitStr::new(&root.to_string(), root.span());
    let type_count = input.types.len();
    let type_names = input
        .types
        .iter()
        .map(|d| LitStr::new(&d.name.to_string(), d.name.span()));
    let defs = input.types.iter().map(|d| generate_type_def(d, &krate));
    let consts = generate_type_consts(&input.types);

    let vis = &input.vis;
    let module = &input.module;

    Ok(quote! {
        #[allow(non_snake_case, non_upper_case_globals)]
        #vis mod #module {
            /// Name of the root node type.
            pub const ROOT: &str = #root_lit;

            /// Number of declared node types.
            pub const TYPE_COUNT: usize = #type_count;

            /// Declared node type names, in declaration order.
            pub const TYPE_NAMES: &[&str] = &[#(#type_names),*];

            /// Node type names as constants.
            pub mod types {
                #(#consts)*
            }

            /// Definition table of this tree.
            pub fn definitions() -> ::std::vec::Vec<#krate::TypeDef> {
                ::std::vec![#(#defs),*]
            }

            /// A builder with every declaration applied. Bind loaders, then `build()`.
            pub fn builder() -> ::core::result::Result<#krate::SchemaBuilder, #krate::DeclarationError> {
                #krate::SchemaBuilder::from_definitions(&definitions(), ROOT)
            }
        }
    })
}
