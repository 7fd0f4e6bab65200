//! Property-based tests over random leaf sets

use merkle_stream::tree::padding::{level_size, tree_height};
use merkle_stream::{sha256, InMemoryTreeEngine, MerkleProof, StreamingTreeEngine};
use proptest::prelude::*;

fn leaf_sets() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..48), 1..40)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_every_proof_verifies(leaves in leaf_sets()) {
        let tree = InMemoryTreeEngine::new(sha256()).build(&leaves).unwrap();
        for index in 0..leaves.len() as u64 {
            let proof = tree.generate_proof(index).unwrap();
            prop_assert_eq!(proof.leaf_value(), &leaves[index as usize][..]);
            prop_assert!(proof.verify(tree.root(), sha256().as_ref()).unwrap());
        }
    }

    #[test]
    fn prop_engines_agree(leaves in leaf_sets(), pick in any::<prop::sample::Index>()) {
        let tree = InMemoryTreeEngine::new(sha256()).build(&leaves).unwrap();
        let engine = StreamingTreeEngine::new(sha256());
        let metadata = engine.build(&leaves).unwrap();
        prop_assert_eq!(&metadata.root, tree.root());
        prop_assert_eq!(metadata.height, tree.height());

        let index = pick.index(leaves.len()) as u64;
        let streamed = engine
            .generate_proof(&leaves, index, leaves.len() as u64, None)
            .unwrap();
        prop_assert_eq!(streamed, tree.generate_proof(index).unwrap());
    }

    #[test]
    fn prop_codec_is_canonical(leaves in leaf_sets(), pick in any::<prop::sample::Index>()) {
        let tree = InMemoryTreeEngine::new(sha256()).build(&leaves).unwrap();
        let proof = tree.generate_proof(pick.index(leaves.len()) as u64).unwrap();
        let bytes = proof.encode().unwrap();
        let decoded = MerkleProof::decode(&bytes).unwrap();
        prop_assert_eq!(decoded.encode().unwrap(), bytes);
    }

    #[test]
    fn prop_decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = MerkleProof::decode(&bytes);
    }

    #[test]
    fn prop_height_is_reduction_count(count in 1u64..100_000) {
        let height = tree_height(count);
        prop_assert_eq!(level_size(count, height), 1);
        if height > 0 {
            prop_assert!(level_size(count, height - 1) > 1);
        }
    }
}
