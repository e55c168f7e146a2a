use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Data, DeriveInput, Error, Field, Fields, GenericArgument, Ident, PathArguments, Result, Type,
    spanned::Spanned,
};

pub(crate) fn expand_transcode(input: &DeriveInput) -> Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        Err(Error::new(
            input.span(),
            "`Transcode` may only be derived on structs.",
        ))?
    };

    let Fields::Named(fields) = &data.fields else {
        Err(Error::new(
            input.span(),
            "`Transcode` may only be derived on structs with named fields.",
        ))?
    };

    if !input.generics.params.is_empty() {
        Err(Error::new_spanned(
            &input.generics,
            "`Transcode` may not be derived on generic structs.",
        ))?
    }

    let fields = fields
        .named
        .iter()
        .map(FieldMetadata::parse)
        .collect::<Result<Vec<_>>>()?;

    let decodes = fields.iter().map(FieldMetadata::decode);
    let encodes = fields.iter().map(FieldMetadata::encode);

    let name = &input.ident;

    let expanded = quote! {
        impl ::cassette::compose::Transcode for #name {
            fn decode_fields(
                scope: &mut ::cassette::compose::DecodingScope<'_, Self>,
            ) -> ::cassette::compose::Step<Self> {
                ::core::result::Result::Ok(Self {
                    #(#decodes,)*
                })
            }

            fn encode_fields<'v>(
                &'v self,
                scope: &mut ::cassette::compose::EncodingScope<'_, 'v, Self>,
            ) -> ::core::result::Result<(), ::cassette::EncodeError> {
                #(#encodes;)*
                ::core::result::Result::Ok(())
            }
        }
    };

    Ok(expanded.into())
}

#[derive(Debug)]
struct FieldMetadata {
    name: Ident,
    ty: Type,
    handling: Handling,
}

#[derive(Debug)]
enum Handling {
    /// Through the type's `Field` implementation.
    Field,
    /// Through the type's own `Transcode` codecs.
    Nested,
    /// An optional link back to the deriving type.
    RecursiveOption,
    /// A collection of links back to the deriving type.
    RecursiveVec,
}

impl FieldMetadata {
    fn parse(field: &Field) -> Result<Self> {
        let Some(name) = field.ident.clone() else {
            Err(Error::new_spanned(field, "Field must be named."))?
        };

        let mut handling = Handling::Field;

        for attr in field.attrs.iter().filter(|a| a.path().is_ident("transcode")) {
            attr.parse_nested_meta(|meta| {
                if !matches!(handling, Handling::Field) {
                    Err(meta.error("Field may carry only one `transcode` option."))?
                }

                if meta.path.is_ident("nested") {
                    handling = Handling::Nested;
                } else if meta.path.is_ident("recursive") {
                    handling = recursive_shape(&field.ty)?;
                } else {
                    Err(meta.error("Option must be `nested` or `recursive`."))?
                }

                Ok(())
            })?;
        }

        Ok(Self {
            name,
            ty: field.ty.clone(),
            handling,
        })
    }

    fn decode(&self) -> TokenStream2 {
        let Self { name, ty, handling } = self;

        let value = match handling {
            Handling::Field => quote! {
                <#ty as ::cassette::compose::Field>::decode_field(scope)?
            },
            Handling::Nested => quote! {
                scope.decode_with(<#ty as ::cassette::compose::Transcode>::decoder)?
            },
            Handling::RecursiveOption => quote! {
                scope.self_or_none()?.map(::core::convert::Into::into)
            },
            Handling::RecursiveVec => quote! {
                scope
                    .self_vec()?
                    .into_iter()
                    .map(::core::convert::Into::into)
                    .collect()
            },
        };

        quote! { #name: #value }
    }

    fn encode(&self) -> TokenStream2 {
        let Self { name, ty, handling } = self;

        match handling {
            Handling::Field => quote! {
                ::cassette::compose::Field::encode_field(&self.#name, scope)?
            },
            Handling::Nested => quote! {
                scope.write(&self.#name, &<#ty as ::cassette::compose::Transcode>::encoder())?
            },
            Handling::RecursiveOption => quote! {
                scope.self_or_none(
                    self.#name.as_ref().map(::core::borrow::Borrow::<Self>::borrow),
                )?
            },
            Handling::RecursiveVec => quote! {
                scope.self_collection(
                    self.#name.iter().map(::core::borrow::Borrow::<Self>::borrow),
                )?
            },
        }
    }
}

fn recursive_shape(ty: &Type) -> Result<Handling> {
    let shape_error = || {
        Error::new_spanned(
            ty,
            "Recursive field must have type `Option<P>` or `Vec<P>`, where `P` is `Rc<Self>` or `Arc<Self>`.",
        )
    };

    let Some((outer, inner)) = single_argument(ty) else {
        Err(shape_error())?
    };

    // Finished values are cloned when a script is replayed, so links must be
    // shared rather than owned.
    match single_argument(inner) {
        Some((pointer, _)) if pointer == "Rc" || pointer == "Arc" => {}
        _ => Err(shape_error())?,
    }

    if outer == "Option" {
        Ok(Handling::RecursiveOption)
    } else if outer == "Vec" {
        Ok(Handling::RecursiveVec)
    } else {
        Err(shape_error())
    }
}

/// The last path segment of `ty` and its only type argument.
fn single_argument(ty: &Type) -> Option<(&Ident, &Type)> {
    let Type::Path(path) = ty else {
        return None;
    };

    let segment = path.path.segments.last()?;

    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };

    match arguments.args.first() {
        Some(GenericArgument::Type(inner)) if arguments.args.len() == 1 => Some((&segment.ident, inner)),
        _ => None,
    }
}
