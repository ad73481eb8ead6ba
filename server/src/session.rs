//! Session-id generation: `<id>-<random-hex>`, auto-filled whenever a chat
//! request omits one so every call is addressable and replayable.

use rand::RngCore;

pub fn generate_session_id(id: &str) -> String {
    let mut bytes = [0u8; 6];
    rand::thread_rng().fill_bytes(&mut bytes);
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{id}-{hex}")
}
