//! Decoding many independent regions at once.
//!
//! An [`Engine`] is not shareable between threads, so each rayon worker opens
//! its own from the same configuration. Regions are decoded independently and
//! come back in input order.

use std::time::Instant;

use rayon::prelude::*;

use crate::{Address, Disassembly, DisassemblyError, Engine, EngineConfig};

/// One buffer to decode and the address of its first byte.
pub type Region<'a> = (&'a [u8], Address);

/// Decode every region with its own engine.
///
/// # Arguments
/// * `config` - Engine configuration shared by all workers
/// * `regions` - Buffers and their base addresses
/// * `count` - Per-region instruction limit, `0` for no limit
///
/// # Returns
/// One [`Disassembly`] per region, in the order given. The configuration is
/// validated before any work starts, so an unsupported pair fails the whole
/// call instead of every region.
pub fn disasm_regions(
    config: &EngineConfig,
    regions: &[Region<'_>],
    count: usize,
) -> Result<Vec<Disassembly>, DisassemblyError> {
    // Surfaces construction errors once, on the calling thread
    Engine::with_config(config.clone())?.close()?;

    log::debug!(
        "Decoding {} regions for {} in parallel",
        regions.len(),
        config.arch
    );
    let start_time = Instant::now();

    let results = regions
        .par_iter()
        .map_init(
            || Engine::with_config(config.clone()),
            |engine, (code, address)| match engine {
                Ok(engine) => Ok(engine.disasm(code, *address, count)),
                Err(err) => Err(err.clone()),
            },
        )
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!(
        "Decoded {} instructions across {} regions in {:?}",
        results.iter().map(Disassembly::instruction_count).sum::<usize>(),
        results.len(),
        start_time.elapsed()
    );

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Architecture, Mode};

    #[test]
    fn test_empty_region_list() {
        let config = EngineConfig::new(Architecture::X86, Mode::Mode64);
        let results = disasm_regions(&config, &[], 0).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_invalid_config_fails_up_front() {
        let config = EngineConfig::new(Architecture::Mips, Mode::Thumb);
        let code = [0u8; 4];
        let err = disasm_regions(&config, &[(&code, 0)], 0).unwrap_err();
        assert!(err.is_initialization());
    }

    #[test]
    fn test_matches_sequential_decoding() {
        let config = EngineConfig::new(Architecture::X86, Mode::Mode64);
        // push rbp; mov rbp, rsp; ret
        let prologue = [0x55, 0x48, 0x89, 0xe5, 0xc3];
        // mov eax, 1; then a truncated mov
        let broken = [0xb8, 0x01, 0x00, 0x00, 0x00, 0xb8, 0x01];

        let regions: Vec<Region<'_>> = (0..16)
            .map(|i| {
                if i % 2 == 0 {
                    (&prologue[..], 0x1000 * i as Address)
                } else {
                    (&broken[..], 0x1000 * i as Address)
                }
            })
            .collect();

        let parallel = disasm_regions(&config, &regions, 0).unwrap();

        let engine = Engine::with_config(config).unwrap();
        let sequential: Vec<_> = regions
            .iter()
            .map(|(code, address)| engine.disasm(code, *address, 0))
            .collect();

        assert_eq!(parallel, sequential);
        assert_eq!(parallel[0].instruction_count(), 3);
        assert_eq!(parallel[1].instruction_count(), 1);
        assert_eq!(parallel[1].error.map(|e| e.address), Some(0x1005));
    }
}
