#![cfg(feature = "std")]

mod support;

use std::{rc::Rc, thread};

use cassette::{
    DecodeError, DecodeState, Decoder, Encoder, Endianness,
    collect::to_vec,
    compose::{ComposedDecoder, ComposedEncoder, DecodingScope, EncodingScope, Step, compose},
    decode::fixed,
    encode::FixedEncoder,
};
use support::trickle;

const DEPTH: u32 = 100_000;

#[derive(Clone)]
struct Link {
    value: u32,
    next: Option<Rc<Link>>,
}

// Long chains must not be dropped recursively either.
impl Drop for Link {
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(link) = next {
            match Rc::try_unwrap(link) {
                Ok(mut link) => next = link.next.take(),
                Err(_) => break,
            }
        }
    }
}

fn link_decoder() -> ComposedDecoder<Link, impl FnMut(&mut DecodingScope<'_, Link>) -> Step<Link>> {
    compose(|scope| {
        let value = scope.u32()?;
        let next = scope.self_or_none()?.map(Rc::new);
        Ok(Link { value, next })
    })
}

fn link_encoder() -> impl Encoder<Link> {
    ComposedEncoder::new(|link: &Link, scope: &mut EncodingScope<'_, '_, Link>| {
        scope.u32(link.value)?;
        scope.self_or_none(link.next.as_deref())
    })
}

fn chain(len: u32) -> Link {
    let mut link = Link {
        value: len - 1,
        next: None,
    };
    for value in (0..len - 1).rev() {
        link = Link {
            value,
            next: Some(Rc::new(link)),
        };
    }
    link
}

fn chain_bytes(len: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    for value in 0..len {
        bytes.extend_from_slice(&value.to_be_bytes());
        bytes.push(u8::from(value + 1 < len));
    }
    bytes
}

fn values(link: &Link) -> Vec<u32> {
    let mut values = vec![link.value];
    let mut next = link.next.as_deref();
    while let Some(link) = next {
        values.push(link.value);
        next = link.next.as_deref();
    }
    values
}

#[derive(Clone, Debug, PartialEq)]
struct Tree {
    label: String,
    children: Vec<Tree>,
}

fn tree(label: &str, children: Vec<Tree>) -> Tree {
    Tree {
        label: label.to_owned(),
        children,
    }
}

fn tree_decoder() -> ComposedDecoder<Tree, impl FnMut(&mut DecodingScope<'_, Tree>) -> Step<Tree>> {
    compose(|scope| {
        let label = scope.string()?;
        let children = scope.self_vec()?;
        Ok(Tree { label, children })
    })
}

fn sample_tree() -> Tree {
    tree(
        "root",
        vec![
            tree("a", vec![tree("a1", vec![tree("a1x", vec![])]), tree("a2", vec![])]),
            tree("", vec![]),
            tree("c", vec![tree("c1", vec![])]),
        ],
    )
}

#[test]
fn deep_chain_decodes_on_a_flat_stack() {
    let link = link_decoder()
        .decode_slice(&chain_bytes(DEPTH))
        .into_value()
        .unwrap();
    assert_eq!(values(&link), (0..DEPTH).collect::<Vec<_>>());
}

#[test]
fn deep_chain_encodes_on_a_flat_stack() {
    let bytes = link_encoder().encode_to_vec(&chain(DEPTH)).unwrap();
    assert_eq!(bytes, chain_bytes(DEPTH));
}

#[test]
fn trickled_chain_resumes_at_every_byte() {
    let bytes = chain_bytes(4);
    let (link, calls) = trickle(&mut link_decoder(), &bytes);
    assert_eq!(values(&link), [0, 1, 2, 3]);
    assert_eq!(calls, bytes.len() + 1);
}

#[test]
fn suspension_keeps_nested_frames() {
    let bytes = chain_bytes(5);
    let mut decoder = link_decoder();
    // Three complete links and half of the fourth value.
    assert!(decoder.decode_slice(&bytes[..17]).is_processing());
    assert_eq!(decoder.depth(), 3);
    let link = decoder.decode_slice(&bytes[17..]).into_value().unwrap();
    assert_eq!(values(&link), [0, 1, 2, 3, 4]);
    assert_eq!(decoder.depth(), 0);
}

#[test]
fn reset_mid_recursion_is_idempotent() {
    let bytes = chain_bytes(6);
    let mut decoder = link_decoder();
    assert!(decoder.decode_slice(&bytes[..20]).is_processing());
    decoder.reset();
    decoder.reset();
    assert_eq!(decoder.depth(), 0);
    let link = decoder.decode_slice(&bytes).into_value().unwrap();
    assert_eq!(values(&link), [0, 1, 2, 3, 4, 5]);
}

#[test]
fn trickled_tree_round_trip() {
    let encoder = ComposedEncoder::new(|tree: &Tree, scope: &mut EncodingScope<'_, '_, Tree>| {
        scope.string(&tree.label)?;
        scope.self_collection(&tree.children)
    });
    let expected = sample_tree();
    let bytes = encoder.encode_to_vec(&expected).unwrap();
    let (decoded, _) = trickle(&mut tree_decoder(), &bytes);
    assert_eq!(decoded, expected);
}

#[test]
fn nested_failure_then_reset() {
    let mut decoder = tree_decoder();
    #[rustfmt::skip]
    let bad = [
        0, 0, 0, 0, 0, 0, 0, 1,
            0, 0, 0, 0, 0, 0, 0, 1,
                0, 0, 0, 0, 0xff, 0xff, 0xff, 0xff,
    ];
    let state = decoder.decode_slice(&bad);
    assert!(matches!(state, DecodeState::Error(DecodeError::NegativeSize(-1))));

    decoder.reset();
    let state = decoder.decode_slice(&[0, 0, 0, 1, b'x', 0, 0, 0, 0]);
    assert_eq!(state.into_value(), Some(tree("x", vec![])));
}

#[test]
fn one_encoder_serves_many_threads() {
    let encoder = ComposedEncoder::new(|tree: &Tree, scope: &mut EncodingScope<'_, '_, Tree>| {
        scope.string(&tree.label)?;
        scope.self_collection(&tree.children)
    });
    let trees: Vec<Tree> = (0..8)
        .map(|i| tree(&i.to_string(), vec![sample_tree(); i]))
        .collect();
    let expected: Vec<Vec<u8>> = trees
        .iter()
        .map(|tree| encoder.encode_to_vec(tree).unwrap())
        .collect();

    let encoded: Vec<Vec<u8>> = thread::scope(|s| {
        let encoder = &encoder;
        let handles: Vec<_> = trees
            .iter()
            .map(|tree| s.spawn(move || encoder.encode_to_vec(tree).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(encoded, expected);

    let mut decoder = tree_decoder();
    for (bytes, tree) in encoded.iter().zip(&trees) {
        assert_eq!(decoder.decode_slice(bytes).into_value().as_ref(), Some(tree));
    }
}

#[test]
fn script_chosen_count_layout_round_trip() {
    let count = FixedEncoder::<u16>::new(Endianness::Little);
    let encoder = ComposedEncoder::new(|tree: &Tree, scope: &mut EncodingScope<'_, '_, Tree>| {
        scope.string(&tree.label)?;
        scope.self_collection_with(&tree.children, &count)
    });
    let mut decoder = compose(|scope: &mut DecodingScope<'_, Tree>| {
        let label = scope.string()?;
        let children = scope.self_collection_with(&to_vec(), || fixed::<u16>(Endianness::Little))?;
        Ok(Tree { label, children })
    });

    let expected = sample_tree();
    let bytes = encoder.encode_to_vec(&expected).unwrap();
    assert_eq!(&bytes[..10], [0, 0, 0, 4, b'r', b'o', b'o', b't', 3, 0]);
    let (decoded, _) = trickle(&mut decoder, &bytes);
    assert_eq!(decoded, expected);
}
