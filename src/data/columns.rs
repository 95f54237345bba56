//! Column names as constants for type safety.

/// Star identifiers, stored as `(APOGEE_ID, location)` rows
pub const IDS: &str = "IDs";

/// Effective temperature (K)
pub const TEFF: &str = "TEFF";
/// Iron abundance `[Fe/H]`
pub const FE_H: &str = "FE_H";
/// Alpha-element abundance `[alpha/M]`
pub const ALPHA_M: &str = "ALPHA_M";
/// Carbon abundance `[C/Fe]`
pub const C_FE: &str = "C_FE";
/// Nitrogen abundance `[N/Fe]`
pub const N_FE: &str = "N_FE";

/// Signal-to-noise ratio of the combined spectrum
pub const STACKED_SNR: &str = "stacked_snr";
/// Surface gravity log(g)
pub const LOGG: &str = "LOGG";
/// STARFLAG bitmask, zero when clean
pub const STAR_FLAG: &str = "star_flag";
/// ASPCAPFLAG bitmask, zero when clean
pub const ASPCAP_FLAG: &str = "aspcap_flag";
/// Radial velocity scatter across visits (km/s)
pub const VSCATTER: &str = "VSCATTER";

/// Labels a model is trained and tested on, in output order.
pub const PARAMS: [&str; 5] = [TEFF, FE_H, ALPHA_M, C_FE, N_FE];

/// Quality-control columns needed for test/training set selection.
pub const AUX_COLUMNS: [&str; 5] = [STACKED_SNR, LOGG, STAR_FLAG, ASPCAP_FLAG, VSCATTER];

/// Abundance labels bounded by the metallicity cut, in the order it is applied.
pub const METALS: [&str; 4] = [FE_H, ALPHA_M, C_FE, N_FE];

/// The training labels.
pub fn params() -> Vec<&'static str> {
    PARAMS.to_vec()
}

/// Labels followed by the quality-control columns.
pub fn columns() -> Vec<&'static str> {
    let mut cols = params();
    cols.extend(AUX_COLUMNS);
    log::debug!("selection columns: {cols:?}");
    cols
}
