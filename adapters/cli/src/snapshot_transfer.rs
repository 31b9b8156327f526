use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use mazecrawl_core::PlayerSnapshot;
use thiserror::Error;

const TOKEN_DOMAIN: &str = "mazecrawl";
const TOKEN_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub(crate) const TOKEN_HEADER: &str = "mazecrawl:v1";
const FIELD_DELIMITER: char = ':';

/// Errors raised while turning snapshots into tokens and back.
#[derive(Debug, Error)]
pub(crate) enum SnapshotTransferError {
    /// The token was empty or contained only whitespace.
    #[error("snapshot token was empty")]
    EmptyToken,
    /// The token stopped before the version segment.
    #[error("snapshot token is missing the version")]
    MissingVersion,
    /// The token stopped before the payload segment.
    #[error("snapshot token is missing the payload")]
    MissingPayload,
    /// The token does not start with the expected domain.
    #[error("snapshot prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The token was produced by an incompatible version.
    #[error("snapshot version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The payload is not valid unpadded base64.
    #[error("could not decode snapshot payload: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The payload is not a serialised snapshot.
    #[error("could not parse snapshot payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
}

/// Encodes a snapshot into a single line suitable for copy and paste.
pub(crate) fn encode(snapshot: &PlayerSnapshot) -> Result<String, SnapshotTransferError> {
    let json = serde_json::to_vec(snapshot).map_err(SnapshotTransferError::InvalidPayload)?;
    Ok(format!("{TOKEN_HEADER}:{}", STANDARD_NO_PAD.encode(json)))
}

/// Decodes a token produced by [`encode`].
pub(crate) fn decode(token: &str) -> Result<PlayerSnapshot, SnapshotTransferError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(SnapshotTransferError::EmptyToken);
    }

    let mut parts = trimmed.splitn(3, FIELD_DELIMITER);
    let domain = parts.next().unwrap_or_default();
    let version = parts.next().ok_or(SnapshotTransferError::MissingVersion)?;
    if domain != TOKEN_DOMAIN {
        return Err(SnapshotTransferError::InvalidPrefix(domain.to_owned()));
    }
    if version != TOKEN_VERSION {
        return Err(SnapshotTransferError::UnsupportedVersion(version.to_owned()));
    }
    let payload = parts
        .next()
        .filter(|payload| !payload.is_empty())
        .ok_or(SnapshotTransferError::MissingPayload)?;

    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(SnapshotTransferError::InvalidEncoding)?;
    serde_json::from_slice(&bytes).map_err(SnapshotTransferError::InvalidPayload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mazecrawl_core::{CellCoord, Equipment, FogMask, LoreId, Slot};

    fn explorer() -> PlayerSnapshot {
        let mut seen = FogMask::new(12, 8);
        seen.mark(CellCoord::new(3, 4));
        let mut equipment = Equipment::default();
        let _ = equipment.insert(Slot::RightHand, "pickaxe_basic");
        PlayerSnapshot {
            cell: CellCoord::new(3, 4),
            angle: 1.25,
            seen,
            stats: [("strength".to_owned(), 3)].into_iter().collect(),
            equipment,
            inventory: vec!["coin".to_owned(), "coin".to_owned()],
            backpack_weight_used: 0.02,
            character: Some("miner".to_owned()),
            known_lore: vec![LoreId::new(2)],
            tool_durability: [(Slot::RightHand, 12)].into_iter().collect(),
        }
    }

    #[test]
    fn tokens_restore_the_snapshot() {
        let snapshot = explorer();
        let token = encode(&snapshot).expect("encodes");
        assert!(token.starts_with("mazecrawl:v1:"));
        assert!(!token.contains('\n'));

        let decoded = decode(&format!("  {token}\n")).expect("decodes");
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(matches!(decode("   "), Err(SnapshotTransferError::EmptyToken)));
        assert!(matches!(decode("mazecrawl"), Err(SnapshotTransferError::MissingVersion)));
        assert!(matches!(decode("mazecrawl:v1"), Err(SnapshotTransferError::MissingPayload)));
        assert!(matches!(
            decode("maze:v1:e30"),
            Err(SnapshotTransferError::InvalidPrefix(prefix)) if prefix == "maze"
        ));
        assert!(matches!(
            decode("mazecrawl:v2:e30"),
            Err(SnapshotTransferError::UnsupportedVersion(version)) if version == "v2"
        ));
        assert!(matches!(
            decode("mazecrawl:v1:***"),
            Err(SnapshotTransferError::InvalidEncoding(_))
        ));
        // "{}" is valid JSON but not a snapshot.
        assert!(matches!(
            decode("mazecrawl:v1:e30"),
            Err(SnapshotTransferError::InvalidPayload(_))
        ));
    }
}
