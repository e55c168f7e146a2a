use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod transcode;

#[proc_macro_derive(Transcode, attributes(transcode))]
pub fn derive_transcode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match transcode::expand_transcode(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error().into(),
    }
}
