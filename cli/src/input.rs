use std::io::Read;

use carbon_protocol::TrackRequest;
use tracing::warn;

/// Reads the request from `reader`, using the default duration when the
/// input can't be read or parsed.
pub fn read_request<R: Read>(mut reader: R) -> TrackRequest {
    let mut input = String::new();
    if let Err(e) = reader.read_to_string(&mut input) {
        warn!(error = %e, "Failed to read request, using default duration");
        return TrackRequest::default();
    }

    match TrackRequest::from_json(&input) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Invalid request, using default duration");
            TrackRequest::default()
        }
    }
}
