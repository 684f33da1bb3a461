//! Import helpers for simplifying resource import implementations
//!
//! Imported resources start from a stub state holding only the id. The read
//! that follows has no prior state to preserve, so it needs to know it is
//! completing an import. Import therefore tags the private state and the
//! read checks the tag instead of guessing from which fields are null.

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, DynamicValue, PrivateStateData};

/// Private state key written by import and consumed by the next read
pub const IMPORT_MARKER_KEY: &str = "import";

/// Sets the import ID to a specific attribute in state and tags the
/// resource as freshly imported
///
/// Example: ID "123" -> state.id = "123", private["import"] = true
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let mut state = DynamicValue::object();

    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!("Could not set attribute '{}' to value '{}'", attr_path, request.id),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    let private = match tag_imported(&PrivateStateData::new()) {
        Ok(private) => private,
        Err(diagnostic) => {
            response.diagnostics.push(diagnostic);
            return;
        }
    };

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private,
    });
}

/// Adds the import marker to private state and encodes it
pub fn tag_imported(private: &PrivateStateData) -> Result<Vec<u8>, Diagnostic> {
    let mut private = private.clone();
    let marker = rmp_serde::to_vec(&true).map_err(|e| {
        Diagnostic::error("Failed to encode import marker", e.to_string())
    })?;
    private.set_key(IMPORT_MARKER_KEY, marker);
    private
        .encode()
        .map_err(|e| Diagnostic::error("Failed to encode private state", e.to_string()))
}

/// Removes the import marker from encoded private state.
///
/// Returns whether the marker was set, and the private state to hand back
/// to Terraform without it. Undecodable private state counts as untagged.
pub fn take_import_marker(private: &[u8]) -> (bool, Vec<u8>) {
    let mut data = match PrivateStateData::decode(private) {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring undecodable private state");
            return (false, Vec::new());
        }
    };

    let imported = data
        .remove_key(IMPORT_MARKER_KEY)
        .and_then(|raw| rmp_serde::from_slice::<bool>(&raw).ok())
        .unwrap_or(false);

    match data.encode() {
        Ok(encoded) => (imported, encoded),
        Err(_) => (imported, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientCapabilities;

    fn import(id: &str) -> ImportResourceStateResponse {
        let request = ImportResourceStateRequest {
            type_name: "uptimerobot_psp".to_string(),
            id: id.to_string(),
            client_capabilities: ClientCapabilities::default(),
        };
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(&Context::new(), AttributePath::new("id"), &request, &mut response);
        response
    }

    #[test]
    fn passthrough_sets_id_and_tags_private_state() {
        let response = import("123");

        assert!(response.diagnostics.is_empty());
        let imported = &response.imported_resources[0];
        assert_eq!(
            imported.state.get_string(&AttributePath::new("id")).unwrap(),
            "123"
        );

        let (tagged, rest) = take_import_marker(&imported.private);
        assert!(tagged);
        assert!(rest.is_empty());
    }

    #[test]
    fn marker_is_consumed_once() {
        let response = import("123");
        let (_, rest) = take_import_marker(&response.imported_resources[0].private);

        let (tagged_again, _) = take_import_marker(&rest);
        assert!(!tagged_again);
    }

    #[test]
    fn other_private_keys_survive() {
        let mut private = PrivateStateData::new();
        private.set_key("etag", b"abc".to_vec());
        let encoded = tag_imported(&private).unwrap();

        let (tagged, rest) = take_import_marker(&encoded);

        assert!(tagged);
        let rest = PrivateStateData::decode(&rest).unwrap();
        assert_eq!(rest.get_key("etag"), Some(&b"abc"[..]));
    }

    #[test]
    fn empty_private_state_is_untagged() {
        assert_eq!(take_import_marker(&[]), (false, Vec::new()));
    }
}
