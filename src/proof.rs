//! snarkjs proof artifacts and their Solidity calling convention.
//!
//! snarkjs writes three JSON files per proof run:
//!
//! - `proof.json`: `pi_a`, `pi_b`, `pi_c` as projective coordinates
//!   (decimal strings, `z = 1` for affine points)
//! - `public.json`: the ordered public signals
//! - `verification_key.json`: `vk_alpha_1`, `vk_beta_2`, `vk_gamma_2`,
//!   `vk_delta_2` and the `IC` points, one more than `nPublic`
//!
//! The contract's verifier takes G2 coordinates in `(c1, c0)` order, the
//! reverse of what snarkjs writes. [`SolidityProof`] holds the proof in that
//! on-chain order and is the single proof shape the registry deals in.

use crate::config::ArtifactsConfig;
use crate::types::IdentityHash;
use crate::utils::{parse_u256, u256_to_field};
use anyhow::{Context, Result};
use ark_bn254::{Bn254, Fq, Fq2, G1Affine, G2Affine};
use ark_groth16::{Proof, VerifyingKey};
use ethers::types::U256;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const GROTH16_PROTOCOL: &str = "groth16";
pub const BN254_CURVE: &str = "bn128";

/// `proof.json` as written by `snarkjs groth16 prove`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnarkjsProof {
    pub pi_a: Vec<String>,
    pub pi_b: Vec<Vec<String>>,
    pub pi_c: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<String>,
}

/// `verification_key.json` as written by `snarkjs zkey export verificationkey`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnarkjsVerificationKey {
    pub protocol: String,
    pub curve: String,
    #[serde(rename = "nPublic")]
    pub n_public: usize,
    pub vk_alpha_1: Vec<String>,
    pub vk_beta_2: Vec<Vec<String>>,
    pub vk_gamma_2: Vec<Vec<String>>,
    pub vk_delta_2: Vec<Vec<String>>,
    #[serde(rename = "IC")]
    pub ic: Vec<Vec<String>>,
}

/// A Groth16 proof laid out the way `submitProof(id, a, b, c)` expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolidityProof {
    pub a: [U256; 2],
    pub b: [[U256; 2]; 2],
    pub c: [U256; 2],
}

fn check_tags(protocol: Option<&str>, curve: Option<&str>) -> Result<()> {
    if let Some(protocol) = protocol {
        if protocol != GROTH16_PROTOCOL {
            return Err(anyhow::anyhow!(
                "Unsupported proof protocol '{protocol}': expected '{GROTH16_PROTOCOL}'"
            ));
        }
    }
    if let Some(curve) = curve {
        if curve != BN254_CURVE {
            return Err(anyhow::anyhow!(
                "Unsupported curve '{curve}': expected '{BN254_CURVE}'"
            ));
        }
    }
    Ok(())
}

/// Reads `[x, y, z]` and returns the affine `[x, y]`; the point at infinity
/// (`z = 0`) becomes `[0, 0]`, the EVM precompile encoding.
fn g1_coordinates(coords: &[String], name: &str) -> Result<[U256; 2]> {
    if coords.len() != 3 && coords.len() != 2 {
        return Err(anyhow::anyhow!(
            "{name} must have 2 or 3 coordinates, got {}",
            coords.len()
        ));
    }
    if coords.len() == 3 {
        let z = parse_u256(&coords[2]).with_context(|| format!("Malformed {name}.z"))?;
        if z.is_zero() {
            return Ok([U256::zero(); 2]);
        }
        if z != U256::one() {
            return Err(anyhow::anyhow!(
                "{name} is not in affine form (z = {z}); re-export it with snarkjs"
            ));
        }
    }
    let x = parse_u256(&coords[0]).with_context(|| format!("Malformed {name}.x"))?;
    let y = parse_u256(&coords[1]).with_context(|| format!("Malformed {name}.y"))?;
    Ok([x, y])
}

/// Reads `[[x0, x1], [y0, y1], [z0, z1]]` in snarkjs `(c0, c1)` order.
fn g2_coordinates(coords: &[Vec<String>], name: &str) -> Result<[[U256; 2]; 2]> {
    if coords.len() != 3 && coords.len() != 2 {
        return Err(anyhow::anyhow!(
            "{name} must have 2 or 3 coordinate pairs, got {}",
            coords.len()
        ));
    }
    let mut pairs = [[U256::zero(); 2]; 3];
    for (i, pair) in coords.iter().enumerate() {
        if pair.len() != 2 {
            return Err(anyhow::anyhow!(
                "{name}[{i}] must be a pair of field elements, got {} values",
                pair.len()
            ));
        }
        for (j, value) in pair.iter().enumerate() {
            pairs[i][j] =
                parse_u256(value).with_context(|| format!("Malformed {name}[{i}][{j}]"))?;
        }
    }
    if coords.len() == 3 {
        let z = pairs[2];
        if z[0].is_zero() && z[1].is_zero() {
            return Ok([[U256::zero(); 2]; 2]);
        }
        if z != [U256::one(), U256::zero()] {
            return Err(anyhow::anyhow!(
                "{name} is not in affine form; re-export it with snarkjs"
            ));
        }
    }
    Ok([pairs[0], pairs[1]])
}

fn g1_point(coords: [U256; 2], name: &str) -> Result<G1Affine> {
    if coords[0].is_zero() && coords[1].is_zero() {
        return Ok(G1Affine::identity());
    }
    let x: Fq = u256_to_field(coords[0]).with_context(|| format!("{name}.x out of range"))?;
    let y: Fq = u256_to_field(coords[1]).with_context(|| format!("{name}.y out of range"))?;
    let point = G1Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(anyhow::anyhow!("{name} is not a valid G1 point"));
    }
    Ok(point)
}

/// Builds a G2 point from `(c0, c1)` ordered coordinate pairs.
fn g2_point(coords: [[U256; 2]; 2], name: &str) -> Result<G2Affine> {
    if coords.iter().flatten().all(U256::is_zero) {
        return Ok(G2Affine::identity());
    }
    let fq2 = |pair: [U256; 2], axis: &str| -> Result<Fq2> {
        let c0: Fq =
            u256_to_field(pair[0]).with_context(|| format!("{name}.{axis}.c0 out of range"))?;
        let c1: Fq =
            u256_to_field(pair[1]).with_context(|| format!("{name}.{axis}.c1 out of range"))?;
        Ok(Fq2::new(c0, c1))
    };
    let point = G2Affine::new_unchecked(fq2(coords[0], "x")?, fq2(coords[1], "y")?);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(anyhow::anyhow!("{name} is not a valid G2 point"));
    }
    Ok(point)
}

fn swap_pairs(coords: [[U256; 2]; 2]) -> [[U256; 2]; 2] {
    [[coords[0][1], coords[0][0]], [coords[1][1], coords[1][0]]]
}

impl SnarkjsProof {
    /// Converts to the contract calling convention, swapping the G2
    /// coordinate pairs of `pi_b`.
    pub fn to_solidity(&self) -> Result<SolidityProof> {
        check_tags(self.protocol.as_deref(), self.curve.as_deref())?;
        let a = g1_coordinates(&self.pi_a, "pi_a")?;
        let b = g2_coordinates(&self.pi_b, "pi_b")?;
        let c = g1_coordinates(&self.pi_c, "pi_c")?;
        Ok(SolidityProof {
            a,
            b: swap_pairs(b),
            c,
        })
    }
}

impl SolidityProof {
    /// Decodes the curve points, checking each is on its curve and in the
    /// prime-order subgroup.
    pub fn to_groth16(&self) -> Result<Proof<Bn254>> {
        Ok(Proof {
            a: g1_point(self.a, "a")?,
            b: g2_point(swap_pairs(self.b), "b")?,
            c: g1_point(self.c, "c")?,
        })
    }
}

impl SnarkjsVerificationKey {
    /// Checks the protocol and curve tags and that `IC` has `nPublic + 1`
    /// points.
    pub fn validate(&self) -> Result<()> {
        check_tags(Some(&self.protocol), Some(&self.curve))?;
        if self.ic.len() != self.n_public + 1 {
            return Err(anyhow::anyhow!(
                "Verification key declares {} public inputs but carries {} IC points (expected {})",
                self.n_public,
                self.ic.len(),
                self.n_public + 1
            ));
        }
        Ok(())
    }

    pub fn to_verifying_key(&self) -> Result<VerifyingKey<Bn254>> {
        self.validate()?;
        let alpha_g1 = g1_point(g1_coordinates(&self.vk_alpha_1, "vk_alpha_1")?, "vk_alpha_1")?;
        let beta_g2 = g2_point(g2_coordinates(&self.vk_beta_2, "vk_beta_2")?, "vk_beta_2")?;
        let gamma_g2 = g2_point(g2_coordinates(&self.vk_gamma_2, "vk_gamma_2")?, "vk_gamma_2")?;
        let delta_g2 = g2_point(g2_coordinates(&self.vk_delta_2, "vk_delta_2")?, "vk_delta_2")?;
        let gamma_abc_g1 = self
            .ic
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let name = format!("IC[{i}]");
                g1_point(g1_coordinates(point, &name)?, &name)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(VerifyingKey {
            alpha_g1,
            beta_g2,
            gamma_g2,
            delta_g2,
            gamma_abc_g1,
        })
    }
}

/// Parses `public.json` signals, rejecting anything outside the scalar field.
pub fn parse_public_signals(signals: &[String]) -> Result<Vec<U256>> {
    signals
        .iter()
        .enumerate()
        .map(|(i, signal)| {
            IdentityHash::parse(signal)
                .map(|hash| hash.as_u256())
                .with_context(|| format!("Invalid public signal #{i}: '{signal}'"))
        })
        .collect()
}

/// Reads and deserialises a JSON file, refusing files above `max_size` bytes.
pub fn read_json_file<T: DeserializeOwned>(path: &Path, max_size: u64) -> Result<T> {
    let metadata = fs::metadata(path)
        .with_context(|| format!("Failed to read metadata of {}", path.display()))?;
    debug!("{}: {} bytes", path.display(), metadata.len());

    if metadata.len() > max_size {
        return Err(anyhow::anyhow!(
            "{} is too large: {} bytes (max {} bytes). Raise artifacts.max_file_size or ZKP_MAX_ARTIFACT_FILE_SIZE if this is expected",
            path.display(),
            metadata.len(),
            max_size
        ));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON in {}", path.display()))
}

/// A proof and its public inputs, loaded from a snarkjs build directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofArtifacts {
    pub proof: SolidityProof,
    pub public_inputs: Vec<U256>,
}

impl ProofArtifacts {
    pub fn from_snarkjs(proof: &SnarkjsProof, public_signals: &[String]) -> Result<Self> {
        Ok(Self {
            proof: proof.to_solidity().context("Malformed proof.json")?,
            public_inputs: parse_public_signals(public_signals)
                .context("Malformed public.json")?,
        })
    }

    pub fn load(proof_path: &Path, public_path: &Path, max_size: u64) -> Result<Self> {
        let proof: SnarkjsProof = read_json_file(proof_path, max_size)?;
        let public_signals: Vec<String> = read_json_file(public_path, max_size)?;
        Self::from_snarkjs(&proof, &public_signals)
    }

    pub fn load_from_config(config: &ArtifactsConfig) -> Result<Self> {
        Self::load(
            &config.proof_path(),
            &config.public_path(),
            config.effective_max_file_size(),
        )
    }

    /// The identity hash the proof is bound to.
    ///
    /// The identity circuit exposes exactly one public signal; anything else
    /// was produced by a different circuit.
    pub fn identity_hash(&self) -> Result<IdentityHash> {
        match self.public_inputs.as_slice() {
            [single] => IdentityHash::from_u256(*single),
            other => Err(anyhow::anyhow!(
                "Expected exactly one public signal (the identity hash), found {}",
                other.len()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    // The BN254 G1 generator (1, 2) and G2 generator in snarkjs order.
    const G2_X: [&str; 2] = [
        "10857046999023057135944570762232829481370756359578518086990519993285655852781",
        "11559732032986387107991004021392285783925812861821192530917403151452391805634",
    ];
    const G2_Y: [&str; 2] = [
        "8495653923123431417604973247489272438418190587263600148770280649306958101930",
        "4082367875863433681332203403145435568316851327593401208105741076214120093531",
    ];

    fn generator_proof() -> SnarkjsProof {
        SnarkjsProof {
            pi_a: strings(&["1", "2", "1"]),
            pi_b: vec![strings(&G2_X), strings(&G2_Y), strings(&["1", "0"])],
            pi_c: strings(&["1", "2", "1"]),
            protocol: Some("groth16".to_string()),
            curve: Some("bn128".to_string()),
        }
    }

    #[test]
    fn test_to_solidity_swaps_g2_pairs() {
        let proof = generator_proof().to_solidity().unwrap();
        assert_eq!(proof.a, [U256::from(1u64), U256::from(2u64)]);
        assert_eq!(proof.b[0][0], U256::from_dec_str(G2_X[1]).unwrap());
        assert_eq!(proof.b[0][1], U256::from_dec_str(G2_X[0]).unwrap());
        assert_eq!(proof.b[1][0], U256::from_dec_str(G2_Y[1]).unwrap());
        assert_eq!(proof.b[1][1], U256::from_dec_str(G2_Y[0]).unwrap());
    }

    #[test]
    fn test_generator_points_decode() {
        use ark_ec::AffineRepr;

        let proof = generator_proof().to_solidity().unwrap().to_groth16().unwrap();
        assert_eq!(proof.a, G1Affine::generator());
        assert_eq!(proof.b, G2Affine::generator());
        assert_eq!(proof.a, proof.c);
    }

    #[test]
    fn test_point_off_curve_rejected() {
        let mut proof = generator_proof();
        proof.pi_a = strings(&["1", "3", "1"]);
        let err = proof.to_solidity().unwrap().to_groth16().unwrap_err();
        assert!(err.to_string().contains("not a valid G1 point"));
    }

    #[test]
    fn test_non_affine_point_rejected() {
        let mut proof = generator_proof();
        proof.pi_a = strings(&["1", "2", "5"]);
        assert!(proof.to_solidity().is_err());
    }

    #[test]
    fn test_infinity_maps_to_zero_coordinates() {
        let mut proof = generator_proof();
        proof.pi_c = strings(&["0", "1", "0"]);
        let solidity = proof.to_solidity().unwrap();
        assert_eq!(solidity.c, [U256::zero(); 2]);
        assert!(solidity.to_groth16().unwrap().c.infinity);
    }

    #[test]
    fn test_wrong_protocol_rejected() {
        let mut proof = generator_proof();
        proof.protocol = Some("plonk".to_string());
        assert!(proof
            .to_solidity()
            .unwrap_err()
            .to_string()
            .contains("Unsupported proof protocol"));
    }

    #[test]
    fn test_verification_key_ic_count_checked() {
        let vk = SnarkjsVerificationKey {
            protocol: "groth16".to_string(),
            curve: "bn128".to_string(),
            n_public: 1,
            vk_alpha_1: strings(&["1", "2", "1"]),
            vk_beta_2: vec![strings(&G2_X), strings(&G2_Y), strings(&["1", "0"])],
            vk_gamma_2: vec![strings(&G2_X), strings(&G2_Y), strings(&["1", "0"])],
            vk_delta_2: vec![strings(&G2_X), strings(&G2_Y), strings(&["1", "0"])],
            ic: vec![strings(&["1", "2", "1"])],
        };
        assert!(vk.validate().is_err());

        let mut fixed = vk;
        fixed.ic.push(strings(&["1", "2", "1"]));
        assert!(fixed.to_verifying_key().is_ok());
    }

    #[test]
    fn test_identity_hash_requires_single_signal() {
        let artifacts =
            ProofArtifacts::from_snarkjs(&generator_proof(), &strings(&["42"])).unwrap();
        assert_eq!(artifacts.identity_hash().unwrap().to_string(), "42");

        let artifacts =
            ProofArtifacts::from_snarkjs(&generator_proof(), &strings(&["1", "2"])).unwrap();
        assert!(artifacts.identity_hash().is_err());
    }

    #[test]
    fn test_read_json_file_enforces_size_limit() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("public.json");
        fs::write(&path, "[\"1\"]").unwrap();

        let signals: Vec<String> = read_json_file(&path, 1024).unwrap();
        assert_eq!(signals, vec!["1".to_string()]);
        assert!(read_json_file::<Vec<String>>(&path, 2).is_err());
    }
}
