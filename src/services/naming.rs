use chrono::{Local, NaiveDateTime};
use uuid::Uuid;

/// `YYYYMMDDhhmmss`, local time
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Source of wall-clock time for generated names
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Source of unique identifiers for generated names
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Uuid;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Random version 4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Builds destination names of the form `<timestamp>_<uuid><ext>`.
///
/// No check is made against the filesystem; uniqueness rests on the
/// identifier alone.
#[derive(Debug, Clone, Default)]
pub struct FilenameGenerator<C = SystemClock, I = RandomIds> {
    clock: C,
    ids: I,
}

impl<C: Clock, I: IdGenerator> FilenameGenerator<C, I> {
    pub fn new(clock: C, ids: I) -> Self {
        Self { clock, ids }
    }

    pub fn generate(&self, original_filename: &str) -> String {
        format!(
            "{}_{}{}",
            self.clock.now().format(TIMESTAMP_FORMAT),
            self.ids.next_id().hyphenated(),
            extension_of(original_filename)
        )
    }
}

/// Extension of the final path element, leading dot included.
///
/// Returns an empty string when the last element has no dot. Both `/` and
/// `\` end a path element since client-supplied names use either.
pub fn extension_of(name: &str) -> &str {
    let start = name.rfind(['/', '\\']).map_or(0, |i| i + 1);
    let base = &name[start..];
    match base.rfind('.') {
        Some(i) => &base[i..],
        None => "",
    }
}
