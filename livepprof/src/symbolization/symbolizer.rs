use addr2line::Context;
use anyhow::{Context as _, Result};
use gimli::{EndianArcSlice, RunTimeEndian};
use log::{debug, info};
use object::{Object, ObjectSection, ObjectSymbol, SymbolKind};
use parking_lot::{Mutex, RwLock};
use rustc_demangle::demangle;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::binary_path::current_binary;
use super::memory_maps::{parse_memory_maps, MemoryRange};
use super::FrameSource;

const UNKNOWN_FUNCTION: &str = "<unknown>";

/// Symbolizer for resolving instruction pointers to source locations
///
/// Includes a cache to avoid re-resolving the same addresses repeatedly,
/// which significantly improves performance when symbolizing stack traces.
/// The DWARF context is not `Sync`, so lookups are serialized behind a mutex;
/// cache hits only take the read side of the cache lock.
pub struct Symbolizer {
    ctx: Mutex<Context<EndianArcSlice<RunTimeEndian>>>,
    /// ELF symbol table, sorted by address, used when DWARF has no answer
    symbols: Vec<(u64, String)>,
    /// Runtime range of the executable, set when symbolizing a live process
    memory_range: Option<MemoryRange>,
    /// PIE: loaded at a random base, runtime addresses need rebasing
    position_independent: bool,
    /// Cache of resolved frames by address
    cache: RwLock<HashMap<u64, ResolvedFrame>>,
}

impl Symbolizer {
    /// Create a new symbolizer for the given binary
    ///
    /// Addresses are expected to be file-relative (as found by `nm`).
    ///
    /// # Errors
    /// Returns an error if the binary file cannot be read or parsed, or if DWARF debug info is missing
    pub fn new<P: AsRef<Path>>(binary_path: P) -> Result<Self> {
        let binary_data = fs::read(binary_path.as_ref()).context("Failed to read binary file")?;

        let obj_file = object::File::parse(&*binary_data).context("Failed to parse object file")?;

        // Load DWARF debug info
        let endian =
            if obj_file.is_little_endian() { RunTimeEndian::Little } else { RunTimeEndian::Big };

        let load_section =
            |id: gimli::SectionId| -> Result<EndianArcSlice<RunTimeEndian>, gimli::Error> {
                let data = obj_file
                    .section_by_name(id.name())
                    .and_then(|section| section.uncompressed_data().ok())
                    .unwrap_or(std::borrow::Cow::Borrowed(&[][..]));
                Ok(EndianArcSlice::new(Arc::from(&*data), endian))
            };

        let position_independent = obj_file.kind() == object::ObjectKind::Dynamic;
        let dwarf = gimli::Dwarf::load(&load_section)?;
        let ctx = Context::from_dwarf(dwarf).context("Failed to load DWARF debug information")?;

        let mut symbols: Vec<(u64, String)> = obj_file
            .symbols()
            .filter(|sym| sym.kind() == SymbolKind::Text && sym.address() != 0)
            .filter_map(|sym| {
                let name = sym.name().ok()?;
                Some((sym.address(), Self::demangle_symbol(name)))
            })
            .collect();
        symbols.sort_unstable_by_key(|(addr, _)| *addr);
        debug!("Loaded {} text symbols from {}", symbols.len(), binary_path.as_ref().display());

        Ok(Self {
            ctx: Mutex::new(ctx),
            symbols,
            memory_range: None,
            position_independent,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Create a symbolizer for the running process
    ///
    /// Finds the current executable, loads its debug info and reads its
    /// runtime range from `/proc/self/maps`, so that raw instruction pointers
    /// captured in this process can be resolved directly.
    ///
    /// # Errors
    /// Returns an error if the executable cannot be found, read or mapped
    pub fn for_current_process() -> Result<Self> {
        let binary = current_binary()?;
        let binary_str = binary.to_string_lossy().into_owned();
        let mut symbolizer = Self::new(&binary)?;
        let pid = i32::try_from(std::process::id()).context("pid out of range")?;
        symbolizer.memory_range = Some(parse_memory_maps(pid, &binary_str)?);
        info!("Symbolizing current process from {binary_str}");
        Ok(symbolizer)
    }

    /// Runtime range of the executable, if this symbolizer targets a live process
    #[must_use]
    pub fn memory_range(&self) -> Option<MemoryRange> {
        self.memory_range
    }

    /// Resolve an instruction pointer to source location information
    ///
    /// Uses a cache to avoid re-resolving the same address multiple times.
    pub fn resolve(&self, addr: u64) -> ResolvedFrame {
        // Check cache first
        if let Some(cached) = self.cache.read().get(&addr) {
            return cached.clone();
        }

        let resolved = match self.adjust_address(addr) {
            Some(file_offset) => self.resolve_uncached(addr, file_offset),
            None => ResolvedFrame { addr, frames: vec![InlinedFrame::unknown()] },
        };

        // Store in cache
        self.cache.write().insert(addr, resolved.clone());

        resolved
    }

    /// Translate a runtime address into a file offset
    ///
    /// Returns `None` for addresses outside the executable (shared libraries).
    fn adjust_address(&self, addr: u64) -> Option<u64> {
        match self.memory_range {
            Some(range) if range.contains(addr) => {
                Some(if self.position_independent { addr - range.start } else { addr })
            }
            Some(_) => None,
            None => Some(addr),
        }
    }

    fn resolve_uncached(&self, addr: u64, file_offset: u64) -> ResolvedFrame {
        let mut result = Vec::new();

        {
            let ctx = self.ctx.lock();
            if let Ok(mut frame_iter) = ctx.find_frames(file_offset).skip_all_loads() {
                while let Ok(Some(frame)) = frame_iter.next() {
                    let function = frame
                        .function
                        .and_then(|f| f.demangle().ok().map(|s| s.to_string()))
                        .unwrap_or_else(|| UNKNOWN_FUNCTION.to_string());

                    let location = frame.location.map(|loc| SourceLocation {
                        file: loc.file.map(std::string::ToString::to_string),
                        line: loc.line,
                        column: loc.column,
                    });

                    result.push(InlinedFrame { function, location });
                }
            };
        }

        if result.is_empty() {
            // No line info, fall back to the nearest preceding text symbol
            let function = self
                .symbol_for(file_offset)
                .map_or_else(|| UNKNOWN_FUNCTION.to_string(), ToString::to_string);
            result.push(InlinedFrame { function, location: None });
        }

        ResolvedFrame { addr, frames: result }
    }

    fn symbol_for(&self, file_offset: u64) -> Option<&str> {
        let idx = self.symbols.partition_point(|(addr, _)| *addr <= file_offset);
        idx.checked_sub(1).map(|i| self.symbols[i].1.as_str())
    }

    /// Demangle a Rust symbol name
    #[must_use]
    pub fn demangle_symbol(symbol: &str) -> String {
        format!("{:#}", demangle(symbol))
    }
}

impl FrameSource for Symbolizer {
    fn source_line(&self, addr: u64) -> Result<Vec<InlinedFrame>> {
        Ok(self.resolve(addr).frames)
    }
}

/// A resolved stack frame (may contain multiple inlined frames)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFrame {
    pub addr: u64,
    pub frames: Vec<InlinedFrame>,
}

/// An inlined frame within a resolved frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinedFrame {
    pub function: String,
    pub location: Option<SourceLocation>,
}

impl InlinedFrame {
    /// Frame with a known function, file and line
    #[must_use]
    pub fn new(function: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            function: function.into(),
            location: Some(SourceLocation {
                file: Some(file.into()),
                line: Some(line),
                column: None,
            }),
        }
    }

    fn unknown() -> Self {
        Self { function: UNKNOWN_FUNCTION.to_string(), location: None }
    }

    /// Source file of the frame, empty when unknown
    #[must_use]
    pub fn file(&self) -> &str {
        self.location.as_ref().and_then(|loc| loc.file.as_deref()).unwrap_or("")
    }
}

/// Source code location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}
