//! Enveloppe binaire des artefacts de modèle
//!
//! Format (little-endian) :
//!
//! ```text
//! magic "FRISKRF\0" | version u16 | kind u8 | blake3 [32] | len u64 | payload
//! ```
//!
//! Le payload est la forêt sérialisée en JSON. L'écriture passe par un fichier
//! temporaire ([`stage`]) renommé ensuite ([`commit`]), ce qui permet de
//! préparer plusieurs artefacts avant d'en publier aucun.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{FireRiskError, Result};

pub const MAGIC: &[u8; 8] = b"FRISKRF\0";
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = 8 + 2 + 1 + 32 + 8;

/// Nature du classifieur contenu dans un artefact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Vegetation,
    FireRisk,
}

impl ArtifactKind {
    fn tag(self) -> u8 {
        match self {
            ArtifactKind::Vegetation => 1,
            ArtifactKind::FireRisk => 2,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ArtifactKind::Vegetation),
            2 => Some(ArtifactKind::FireRisk),
            _ => None,
        }
    }
}

/// Encode une valeur dans l'enveloppe
pub fn encode<T: Serialize>(kind: ArtifactKind, value: &T) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(value)
        .map_err(|e| FireRiskError::InvalidParameter(format!("cannot serialize model: {}", e)))?;
    let checksum = blake3::hash(&payload);

    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.push(kind.tag());
    buf.extend_from_slice(checksum.as_bytes());
    buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Décode une enveloppe ; `path` ne sert qu'aux messages d'erreur
pub fn decode<T: DeserializeOwned>(path: &Path, kind: ArtifactKind, bytes: &[u8]) -> Result<T> {
    if bytes.len() < HEADER_LEN {
        return Err(FireRiskError::artifact(path, "file is truncated"));
    }
    if &bytes[0..8] != MAGIC {
        return Err(FireRiskError::artifact(path, "not a fire-risk model file"));
    }

    let version = u16::from_le_bytes([bytes[8], bytes[9]]);
    if version != FORMAT_VERSION {
        return Err(FireRiskError::artifact(
            path,
            format!("unsupported format version {}", version),
        ));
    }

    let found = ArtifactKind::from_tag(bytes[10]);
    if found != Some(kind) {
        return Err(FireRiskError::artifact(
            path,
            format!("expected a {:?} model, found tag {}", kind, bytes[10]),
        ));
    }

    let mut expected = [0u8; 32];
    expected.copy_from_slice(&bytes[11..43]);

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[43..51]);
    let len = u64::from_le_bytes(len_bytes) as usize;

    let payload = &bytes[HEADER_LEN..];
    if payload.len() != len {
        return Err(FireRiskError::artifact(
            path,
            format!("payload length {} does not match header ({})", payload.len(), len),
        ));
    }

    let actual = blake3::hash(payload);
    if actual.as_bytes() != &expected {
        return Err(FireRiskError::artifact(
            path,
            format!(
                "checksum mismatch (header {}, payload {})",
                hex::encode(expected),
                actual.to_hex()
            ),
        ));
    }

    serde_json::from_slice(payload)
        .map_err(|e| FireRiskError::artifact(path, format!("invalid payload: {}", e)))
}

/// Écrit un artefact de façon atomique (fichier temporaire puis rename)
pub fn write<T: Serialize>(path: &Path, kind: ArtifactKind, value: &T) -> Result<()> {
    let tmp = stage(path, kind, value)?;
    commit(&tmp, path)
}

/// Écrit l'enveloppe dans le fichier temporaire de `path` et retourne son chemin
///
/// Rien n'est visible sous `path` avant [`commit`].
pub fn stage<T: Serialize>(path: &Path, kind: ArtifactKind, value: &T) -> Result<PathBuf> {
    let bytes = encode(kind, value)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = tmp_path(path);
    let written = (|| -> std::io::Result<()> {
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    debug!(
        path = %path.display(),
        bytes = bytes.len(),
        checksum = %hex::encode(&bytes[11..43]),
        "Model artifact staged"
    );

    Ok(tmp)
}

/// Publie un fichier préparé par [`stage`]
pub fn commit(tmp: &Path, path: &Path) -> Result<()> {
    if let Err(e) = fs::rename(tmp, path) {
        let _ = fs::remove_file(tmp);
        return Err(e.into());
    }
    Ok(())
}

/// Supprime un fichier préparé mais jamais publié
pub fn discard(tmp: &Path) {
    let _ = fs::remove_file(tmp);
}

/// Lit un artefact
///
/// # Errors
///
/// `ModelArtifact` si le fichier est absent, tronqué, corrompu ou d'une autre nature.
pub fn read<T: DeserializeOwned>(path: &Path, kind: ArtifactKind) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| FireRiskError::artifact(path, e.to_string()))?;
    decode(path, kind, &bytes)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let value = vec![1.5f64, 2.25, -3.0];

        write(&path, ArtifactKind::Vegetation, &value).unwrap();
        let back: Vec<f64> = read(&path, ArtifactKind::Vegetation).unwrap();
        assert_eq!(back, value);
        assert!(!dir.path().join("model.bin.tmp").exists());
    }

    #[test]
    fn test_staged_file_is_invisible_until_commit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fire_rf.bin");

        let tmp = stage(&path, ArtifactKind::FireRisk, &7u8).unwrap();
        assert!(tmp.exists());
        assert!(read::<u8>(&path, ArtifactKind::FireRisk).is_err());

        commit(&tmp, &path).unwrap();
        assert!(!tmp.exists());
        assert_eq!(read::<u8>(&path, ArtifactKind::FireRisk).unwrap(), 7);
    }

    #[test]
    fn test_missing_file() {
        let err = read::<Vec<f64>>(Path::new("/nonexistent/fire_rf.bin"), ArtifactKind::FireRisk)
            .unwrap_err();
        assert!(matches!(err, FireRiskError::ModelArtifact { .. }));
    }

    #[test]
    fn test_corrupted_payload() {
        let mut bytes = encode(ArtifactKind::FireRisk, &vec![1u8, 2, 3]).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;

        let err = decode::<Vec<u8>>(Path::new("x"), ArtifactKind::FireRisk, &bytes).unwrap_err();
        match err {
            FireRiskError::ModelArtifact { reason, .. } => assert!(reason.contains("checksum")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_kind() {
        let bytes = encode(ArtifactKind::Vegetation, &0u8).unwrap();
        assert!(decode::<u8>(Path::new("x"), ArtifactKind::FireRisk, &bytes).is_err());
    }

    #[test]
    fn test_truncated_and_bad_magic() {
        assert!(decode::<u8>(Path::new("x"), ArtifactKind::FireRisk, b"FRISK").is_err());

        let mut bytes = encode(ArtifactKind::FireRisk, &0u8).unwrap();
        bytes[0] = b'X';
        assert!(decode::<u8>(Path::new("x"), ArtifactKind::FireRisk, &bytes).is_err());
    }
}
