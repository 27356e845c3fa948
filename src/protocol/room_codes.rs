use rand::RngExt;
use std::sync::atomic::{AtomicU32, Ordering};

use super::types::RoomName;

/// Per-process rolling counter for the numeric code segment, 0000-9999.
static CODE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Generate a code in the format `IIII-xxxx-xxxx`: the rolling counter
/// followed by two groups of random lowercase letters. Distinct processes
/// share the counter space, so the random groups carry the uniqueness.
fn next_code() -> String {
    let count = CODE_COUNTER.fetch_add(1, Ordering::Relaxed) % 10_000;
    format!("{count:04}-{}-{}", letter_group(), letter_group())
}

fn letter_group() -> String {
    let mut rng = rand::rng();
    (0..4)
        .map(|_| char::from(b'a' + rng.random_range(0..26u8)))
        .collect()
}

/// Generate a fresh room name, e.g. `room-0042-kwpq-zmxc`.
#[must_use]
pub fn generate_room_name() -> RoomName {
    RoomName::from(format!("room-{}", next_code()))
}

/// Generate this replica's instance name, e.g. `SERVER0001-abcd-efgh`.
/// Used as the value written into the next-game-server election cell.
#[must_use]
pub fn generate_instance_name() -> String {
    format!("SERVER{}", next_code())
}
