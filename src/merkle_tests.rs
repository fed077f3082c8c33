#[cfg(test)]
mod tests {
    use crate::merkle::{hash_pair, leaf_for, verify_sorted_proof};
    use crate::types::UserId;
    use crate::MerkleTree;

    fn leaves() -> Vec<[u8; 32]> {
        vec![[1u8; 32], [2u8; 32], [3u8; 32], [4u8; 32]]
    }

    #[test]
    fn test_merkle_tree_creation() {
        let tree = MerkleTree::new(leaves()).unwrap();
        assert_ne!(tree.root, [0u8; 32]);
    }

    #[test]
    fn test_empty_tree_is_rejected() {
        assert!(MerkleTree::new(Vec::new()).is_err());
    }

    #[test]
    fn test_single_leaf_is_root() {
        let tree = MerkleTree::new(vec![[7u8; 32]]).unwrap();
        assert_eq!(tree.root, [7u8; 32]);

        let proof = tree.generate_proof(0).unwrap();
        assert!(proof.siblings.is_empty());
        assert!(tree.verify_proof(&proof));
    }

    #[test]
    fn test_pair_hashing_is_order_independent() {
        let forward = MerkleTree::new(vec![[1u8; 32], [2u8; 32]]).unwrap();
        let reversed = MerkleTree::new(vec![[2u8; 32], [1u8; 32]]).unwrap();
        assert_eq!(forward.root, reversed.root);
    }

    #[test]
    fn test_odd_node_is_promoted() {
        let tree = MerkleTree::new(vec![[1u8; 32], [2u8; 32], [3u8; 32]]).unwrap();
        let expected = hash_pair(&hash_pair(&[1u8; 32], &[2u8; 32]), &[3u8; 32]);
        assert_eq!(tree.root, expected);

        let proof = tree.generate_proof(2).unwrap();
        assert_eq!(proof.siblings, vec![hash_pair(&[1u8; 32], &[2u8; 32])]);
        assert!(tree.verify_proof(&proof));
    }

    #[test]
    fn test_merkle_proof_generation() {
        let tree = MerkleTree::new(leaves()).unwrap();
        let proof = tree.generate_proof(0).unwrap();

        assert_eq!(proof.leaf, [1u8; 32]);
        assert_eq!(proof.root, tree.root);
        assert_eq!(proof.siblings.len(), 2);
    }

    #[test]
    fn test_merkle_proof_verification() {
        let tree = MerkleTree::new(leaves()).unwrap();
        let proof = tree.generate_proof(2).unwrap();

        assert!(tree.verify_proof(&proof));
        assert!(verify_sorted_proof(proof.leaf, &proof.siblings, tree.root));
    }

    #[test]
    fn test_merkle_proof_invalid_verification() {
        let tree1 = MerkleTree::new(leaves()).unwrap();
        let tree2 = MerkleTree::new(vec![[5u8; 32], [6u8; 32], [7u8; 32], [8u8; 32]]).unwrap();

        let proof = tree1.generate_proof(0).unwrap();

        // Should fail because proof is from different tree
        assert!(!tree2.verify_proof(&proof));
    }

    #[test]
    fn test_large_merkle_tree() {
        let leaves: Vec<[u8; 32]> = (0..1000u32)
            .map(|i| {
                let mut leaf = [0u8; 32];
                leaf[0..4].copy_from_slice(&i.to_be_bytes());
                leaf
            })
            .collect();

        let tree = MerkleTree::new(leaves).unwrap();
        for index in [0, 511, 512, 999] {
            let proof = tree.generate_proof(index).unwrap();
            assert!(tree.verify_proof(&proof), "leaf {index}");
        }
    }

    #[test]
    fn test_merkle_proof_with_invalid_index() {
        let tree = MerkleTree::new(leaves()).unwrap();
        assert!(tree.generate_proof(999).is_none());
    }

    #[test]
    fn test_merkle_proof_with_tampered_root() {
        let tree = MerkleTree::new(leaves()).unwrap();
        let mut proof = tree.generate_proof(0).unwrap();

        proof.root = [0xFFu8; 32];

        assert!(!tree.verify_proof(&proof));
    }

    #[test]
    fn test_merkle_proof_with_tampered_leaf() {
        let tree = MerkleTree::new(leaves()).unwrap();
        let mut proof = tree.generate_proof(0).unwrap();

        proof.leaf = [0xFFu8; 32];

        assert!(!tree.verify_proof(&proof));
    }

    #[test]
    fn test_merkle_proof_with_tampered_siblings() {
        let tree = MerkleTree::new(leaves()).unwrap();
        let mut proof = tree.generate_proof(0).unwrap();

        proof.siblings[0] = [0xFFu8; 32];

        assert!(!tree.verify_proof(&proof));
    }

    #[test]
    fn test_user_id_allowlist() {
        let ids: Vec<UserId> = (1..=5)
            .map(|i| UserId::from_label(&format!("User{i}")))
            .collect();
        let tree = MerkleTree::from_user_ids(&ids).unwrap();

        for id in &ids {
            let proof = tree.proof_for_user(id).unwrap();
            assert_eq!(proof.leaf, leaf_for(id));
            assert!(tree.verify_proof(&proof));
        }

        assert!(tree.proof_for_user(&UserId::from_label("User6")).is_none());
        assert_eq!(tree.root_hex().len(), 66);
    }
}
