//! Address chain to aggregation key.
//!
//! The resolver picks a leaf in the chain using a filter substring on source
//! files, then builds the caller stack above it. Results are memoized per
//! address chain in a [`LocationCache`].

use log::trace;
use std::sync::Arc;

use super::cache::LocationCache;
use super::symbolizer::InlinedFrame;
use super::FrameSource;
use crate::domain::{Location, ProfilerError, Result};

/// Resolves leaf-first address chains into [`Location`]s.
///
/// One resolver can be shared by every collector of a profiler, and by
/// several profilers when the caller chooses to.
pub struct SymbolResolver {
    frames: Arc<dyn FrameSource>,
    cache: LocationCache,
}

impl SymbolResolver {
    #[must_use]
    pub fn new(frames: Arc<dyn FrameSource>) -> Self {
        Self { frames, cache: LocationCache::new() }
    }

    /// Number of memoized address chains
    #[must_use]
    pub fn cached_locations(&self) -> usize {
        self.cache.len()
    }

    /// Resolve an address chain, leaf call first and callers after.
    ///
    /// The leaf is the first address whose source file contains `filter`,
    /// or index 0 when nothing matches. The last address is the runtime
    /// entry trampoline and never appears in the stack.
    ///
    /// # Errors
    /// - [`ProfilerError::NoAddr`] if `addrs` is empty
    /// - [`ProfilerError::NoFrame0`] if an address symbolizes to no frame
    /// - symbolizer errors, unchanged
    pub fn resolve(&self, filter: &str, addrs: &[u64]) -> Result<Location> {
        if addrs.is_empty() {
            return Err(ProfilerError::NoAddr);
        }
        if let Some(location) = self.cache.get(addrs) {
            return Ok(location);
        }

        let location = self.resolve_uncached(filter, addrs)?;
        trace!("resolved {} addresses to {location}", addrs.len());
        self.cache.insert(addrs, location.clone());
        Ok(location)
    }

    fn resolve_uncached(&self, filter: &str, addrs: &[u64]) -> Result<Location> {
        let mut lookups: Vec<Option<InlinedFrame>> = vec![None; addrs.len()];

        let mut leaf = 0;
        for i in 0..addrs.len() {
            if self.frame_at(addrs, &mut lookups, i)?.file().contains(filter) {
                leaf = i;
                break;
            }
        }

        let top = addrs.len().saturating_sub(2);
        let mut funcs = Vec::with_capacity((top + 1).saturating_sub(leaf));
        for i in (leaf..=top).rev() {
            funcs.push(func_only(&self.frame_at(addrs, &mut lookups, i)?.function).to_string());
        }

        let leaf_frame = self.frame_at(addrs, &mut lookups, leaf)?;
        Ok(Location {
            function: leaf_frame.function.clone(),
            file: leaf_frame.file().to_string(),
            stack: funcs.join("/"),
        })
    }

    /// Innermost frame of `addrs[i]`, symbolizing each address at most once.
    fn frame_at<'a>(
        &self,
        addrs: &[u64],
        lookups: &'a mut [Option<InlinedFrame>],
        i: usize,
    ) -> Result<&'a InlinedFrame> {
        if lookups[i].is_none() {
            let addr = addrs[i];
            let frame = self
                .frames
                .source_line(addr)?
                .into_iter()
                .next()
                .ok_or(ProfilerError::NoFrame0 { addr })?;
            lookups[i] = Some(frame);
        }
        lookups[i].as_ref().ok_or(ProfilerError::NoFrame0 { addr: addrs[i] })
    }
}

/// Last `/`-separated segment of a qualified function name.
fn func_only(function: &str) -> &str {
    function.rsplit_once('/').map_or(function, |(_, last)| last)
}
