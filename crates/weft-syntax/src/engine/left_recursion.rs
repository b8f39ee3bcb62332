//! Left recursion by growing a seed.
//!
//! When a left-recursive production is entered at some offset, a frame is
//! opened for it in the *seeking* phase. A recursive call that reaches the
//! same production at the same offset while seeking fails, reporting the
//! production in its exclusions. Whatever the remaining alternatives match
//! is the seed.
//!
//! If the seed depended on that blocked call, the frame switches to
//! *growing*: the left-recursive variants are re-run from the seed's trace,
//! and the recursive call now returns the seed at once, marked with
//! `LrSuffix`. Each round that consumes strictly more input replaces the
//! seed. The first round that does not ends the loop, so growth is bounded
//! by the input length.
//!
//! Every left-recursive production gets its own frame, including members of
//! an indirect cycle entered at an offset some other member already owns.
//! A production that recurses both directly and through such a cycle then
//! grows its own seed inside the outer one, and frames stay bounded by the
//! number of productions per offset.
//!
//! ```text
//! LrStart(E) [seed] Push(E.Add) LrSuffix(E) .. Pop Push(E.Add) LrSuffix(E) .. Pop LrEnd(E)
//! ```

use drop_bomb::DropBomb;
use tracing::{debug, trace};

use super::errors::ErrorSink;
use super::parse::{LrExclusions, ParseCx, ParseResult, ParseState};
use crate::event::ParseEvent;
use crate::grammar::ProductionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Seeking,
    Growing { seed_end: usize },
}

/// An active left-recursive production at one offset.
#[derive(Debug)]
pub(crate) struct LrFrame {
    production: ProductionId,
    index: usize,
    phase: Phase,
}

/// Proof that a frame was opened; must be handed back to `exit_frame`.
#[must_use]
struct FrameGuard {
    depth: usize,
    bomb: DropBomb,
}

impl<S: ErrorSink> ParseCx<'_, S> {
    fn enter_frame(&mut self, production: ProductionId, index: usize) -> FrameGuard {
        self.frames.push(LrFrame {
            production,
            index,
            phase: Phase::Seeking,
        });
        self.stats.lr_frames += 1;
        FrameGuard {
            depth: self.frames.len() - 1,
            bomb: DropBomb::new("left-recursion frame was never exited"),
        }
    }

    fn exit_frame(&mut self, mut guard: FrameGuard) {
        guard.bomb.defuse();
        debug_assert_eq!(self.frames.len(), guard.depth + 1);
        self.frames.truncate(guard.depth);
    }

    pub(crate) fn parse_left_recursive(
        &mut self,
        production: ProductionId,
        state: ParseState,
    ) -> ParseResult {
        let index = state.index;
        let active = self
            .frames
            .iter()
            .rev()
            .find(|frame| frame.production == production && frame.index == index)
            .map(|frame| frame.phase);
        match active {
            Some(Phase::Seeking) => {
                return ParseResult::Failure {
                    exclusions: LrExclusions::single(production),
                }
            }
            Some(Phase::Growing { seed_end }) => {
                return ParseResult::Success {
                    state: state.emit(ParseEvent::lr_suffix(production), seed_end, 0),
                    exclusions: LrExclusions::default(),
                }
            }
            None => {}
        }
        self.grow_seed(production, state)
    }

    fn grow_seed(&mut self, production: ProductionId, state: ParseState) -> ParseResult {
        let index = state.index;
        let guard = self.enter_frame(production, index);
        let start = state.emit(ParseEvent::lr_start(production), index, 0);

        let (mut best, mut exclusions) = match self.parse_variants(production, start, false) {
            ParseResult::Success { state, exclusions } => (state, exclusions),
            ParseResult::Failure { exclusions } => {
                self.exit_frame(guard);
                return ParseResult::Failure {
                    exclusions: exclusions.without(production),
                };
            }
        };

        let mut growths = 0usize;
        if exclusions.contains(production) {
            let name = self.grammar.production(production).name();
            debug!(production = name, index, seed_end = best.index, "growing seed");
            loop {
                self.frames[guard.depth].phase = Phase::Growing {
                    seed_end: best.index,
                };
                let retry = ParseState {
                    index,
                    events: best.events.clone(),
                    write_back: 0,
                };
                match self.parse_variants(production, retry, true) {
                    ParseResult::Success {
                        state,
                        exclusions: more,
                    } if state.index > best.index => {
                        trace!(production = name, from = best.index, to = state.index, "seed grew");
                        exclusions.extend(&more);
                        best = state;
                        growths += 1;
                    }
                    _ => break,
                }
            }
            debug!(production = name, growths, end = best.index, "seed done");
        }
        self.stats.lr_growths += growths;
        self.exit_frame(guard);

        let end = best.index;
        ParseResult::Success {
            state: best.emit(ParseEvent::lr_end(production), end, 0),
            exclusions: exclusions.without(production),
        }
    }
}
