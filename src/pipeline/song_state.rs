// holds the pattern and mixer in an arc and rwlock so the ui can edit them
// while the scheduler reads them at every step.

use std::sync::{Arc, RwLock};

use super::mixer::MixerStates;
use super::pattern::Pattern;

#[derive(Clone, Debug, Default)]
pub struct SongState {
    pub pattern: Pattern,
    pub mixer: MixerStates,
}

impl SongState {
    pub fn new_shared(pattern: Pattern, mixer: MixerStates) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(SongState { pattern, mixer }))
    }
}
