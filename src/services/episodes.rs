//! Ground-truth episode reconstruction.
//!
//! An episode is a maximal contiguous run of frames labelled
//! `gt_person_present = true`. Episodes are derived on demand from the
//! frame history and never stored.

use crate::models::{Episode, FrameEvent};

/// Partition a mission's frame history into ground-truth presence episodes.
///
/// Frames must be sorted ascending by `frame_id` (the repository contract
/// guarantees this). Every `true` frame extends or opens the current
/// episode; the first `false` frame after an open episode closes it at the
/// last `true` frame's timestamp. An episode still open at the end of the
/// stream closes at the final `true` frame seen. Single-frame episodes
/// (start == end) are valid.
pub fn reconstruct_episodes(frames: &[FrameEvent]) -> Vec<Episode> {
    let mut episodes = Vec::new();
    let mut open: Option<Episode> = None;

    for frame in frames {
        if frame.gt_person_present {
            match open.as_mut() {
                Some(episode) => episode.end_sec = frame.ts_sec,
                None => {
                    open = Some(Episode {
                        start_sec: frame.ts_sec,
                        end_sec: frame.ts_sec,
                    });
                }
            }
        } else if let Some(episode) = open.take() {
            episodes.push(episode);
        }
    }

    if let Some(episode) = open {
        episodes.push(episode);
    }

    episodes
}
