//! Static option schema for ForceBalance input files.
//!
//! Each option key maps to a scalar [`ValueKind`] and a flag telling whether the option is
//! list-valued. Lookups binary-search sorted static tables.

use serde::Serialize;

/// Scalar type of an option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Int,
    Float,
    Bool,
    Str,
}

/// Schema entry for a single option key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    pub kind: ValueKind,
    /// The option always holds a list, even when written with a single value.
    pub list: bool,
}

/// Which option table a key is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionBlock {
    General,
    Target,
}

impl OptionBlock {
    pub fn name(self) -> &'static str {
        match self {
            OptionBlock::General => "general",
            OptionBlock::Target => "target",
        }
    }
}

const fn scalar(kind: ValueKind) -> OptionSpec {
    OptionSpec { kind, list: false }
}

const fn list(kind: ValueKind) -> OptionSpec {
    OptionSpec { kind, list: true }
}

use ValueKind::{Bool, Float, Int, Str};

static GENERAL_OPTIONS: &[(&str, OptionSpec)] = &[
    ("adaptive_damping", scalar(Float)),
    ("adaptive_factor", scalar(Float)),
    ("amberhome", scalar(Str)),
    ("amoeba_eps", scalar(Float)),
    ("amoeba_pol", scalar(Str)),
    ("asynchronous", scalar(Bool)),
    ("backup", scalar(Bool)),
    ("constrain_charge", scalar(Bool)),
    ("constrain_h", scalar(Bool)),
    ("continue", scalar(Bool)),
    ("converge_lowq", scalar(Bool)),
    ("convergence_gradient", scalar(Float)),
    ("convergence_objective", scalar(Float)),
    ("convergence_step", scalar(Float)),
    ("criteria", scalar(Int)),
    ("duplicate_pnames", scalar(Bool)),
    ("eig_lowerbound", scalar(Float)),
    ("error_tolerance", scalar(Float)),
    ("ffdir", scalar(Str)),
    ("finite_difference_factor", scalar(Float)),
    ("finite_difference_h", scalar(Float)),
    ("forcefield", list(Str)),
    ("gmxpath", scalar(Str)),
    ("gmxsuffix", scalar(Str)),
    ("have_vsite", scalar(Bool)),
    ("jobtype", scalar(Str)),
    ("lm_guess", scalar(Float)),
    ("logarithmic_map", scalar(Bool)),
    ("maxstep", scalar(Int)),
    ("mintrust", scalar(Float)),
    ("normalize_weights", scalar(Bool)),
    ("objective_history", scalar(Int)),
    ("penalty_additive", scalar(Float)),
    ("penalty_alpha", scalar(Float)),
    ("penalty_hyperbolic_b", scalar(Float)),
    ("penalty_multiplicative", scalar(Float)),
    ("penalty_power", scalar(Float)),
    ("penalty_type", scalar(Str)),
    ("print_gradient", scalar(Bool)),
    ("print_hessian", scalar(Bool)),
    ("print_parameters", scalar(Bool)),
    ("readchk", scalar(Str)),
    ("reevaluate", scalar(Bool)),
    ("retain_micro_outputs", scalar(Bool)),
    ("rigid_water", scalar(Bool)),
    ("scan_vals", scalar(Str)),
    ("scanindex_name", list(Str)),
    ("scanindex_num", list(Int)),
    ("search_tolerance", scalar(Float)),
    ("step_lowerbound", scalar(Float)),
    ("tinkerpath", scalar(Str)),
    ("trust0", scalar(Float)),
    ("use_pvals", scalar(Bool)),
    ("verbose_options", scalar(Bool)),
    ("vsite_bonds", scalar(Bool)),
    ("wq_port", scalar(Int)),
    ("writechk", scalar(Str)),
    ("writechk_step", scalar(Bool)),
    ("zerograd", scalar(Int)),
];

static TARGET_OPTIONS: &[(&str, OptionSpec)] = &[
    ("absolute", scalar(Bool)),
    ("adapt_errors", scalar(Bool)),
    ("all_at_once", scalar(Bool)),
    ("amber_leapcmd", scalar(Str)),
    ("anisotropic_box", scalar(Bool)),
    ("attenuate", scalar(Bool)),
    ("cauchy", scalar(Bool)),
    ("coords", scalar(Str)),
    ("dipole_denom", scalar(Float)),
    ("do_cosmo", scalar(Bool)),
    ("energy", scalar(Bool)),
    ("energy_asymptote", scalar(Float)),
    ("energy_denom", scalar(Float)),
    ("energy_mode", scalar(Str)),
    ("energy_upper", scalar(Float)),
    ("epsgrad", scalar(Float)),
    ("eq_steps", scalar(Int)),
    ("expdata_txt", scalar(Str)),
    ("fd_ptypes", list(Str)),
    ("fdgrad", scalar(Bool)),
    ("fdhess", scalar(Bool)),
    ("fdhessdiag", scalar(Bool)),
    ("fitatoms", list(Str)),
    ("force", scalar(Bool)),
    ("force_cuda", scalar(Bool)),
    ("force_map", scalar(Str)),
    ("gas_eq_steps", scalar(Int)),
    ("gas_interval", scalar(Float)),
    ("gas_md_steps", scalar(Int)),
    ("gas_timestep", scalar(Float)),
    ("gmx_mdp", scalar(Str)),
    ("gmx_ndx", scalar(Str)),
    ("gmx_top", scalar(Str)),
    ("hfe_pressure", scalar(Float)),
    ("hfe_temperature", scalar(Float)),
    ("hfedata_txt", scalar(Str)),
    ("hfemode", scalar(Str)),
    ("inter_txt", scalar(Str)),
    ("liquid_eq_steps", scalar(Int)),
    ("liquid_interval", scalar(Float)),
    ("liquid_md_steps", scalar(Int)),
    ("liquid_timestep", scalar(Float)),
    ("manual", scalar(Bool)),
    ("md_steps", scalar(Int)),
    ("md_threads", scalar(Int)),
    ("minimize_energy", scalar(Bool)),
    ("mol2", list(Str)),
    ("n_mcbarostat", scalar(Int)),
    ("n_molecules", scalar(Int)),
    ("name", scalar(Str)),
    ("openmm_platform", scalar(Str)),
    ("openmm_precision", scalar(Str)),
    ("optgeo_options_txt", scalar(Str)),
    ("optimize_geometry", scalar(Bool)),
    ("pdb", scalar(Str)),
    ("polarizability_denom", scalar(Float)),
    ("pure_forces", scalar(Bool)),
    ("qdata_txt", scalar(Str)),
    ("qmboltz", scalar(Float)),
    ("qmboltztemp", scalar(Float)),
    ("quadrupole_denom", scalar(Float)),
    ("quantities", list(Str)),
    ("read", scalar(Str)),
    ("remote", scalar(Bool)),
    ("remote_backup", scalar(Bool)),
    ("remote_prefix", scalar(Str)),
    ("resp", scalar(Bool)),
    ("resp_a", scalar(Float)),
    ("resp_b", scalar(Float)),
    ("rmsd_denom", scalar(Float)),
    ("run_internal", scalar(Bool)),
    ("save_traj", scalar(Int)),
    ("self_pol_alpha", scalar(Float)),
    ("self_pol_mu0", scalar(Float)),
    ("shots", scalar(Int)),
    ("sleepy", scalar(Int)),
    ("tinker_key", scalar(Str)),
    ("type", scalar(Str)),
    ("vibdata_txt", scalar(Str)),
    ("w_alpha", scalar(Float)),
    ("w_cp", scalar(Float)),
    ("w_energy", scalar(Float)),
    ("w_eps0", scalar(Float)),
    ("w_force", scalar(Float)),
    ("w_hvap", scalar(Float)),
    ("w_kappa", scalar(Float)),
    ("w_netforce", scalar(Float)),
    ("w_normalize", scalar(Bool)),
    ("w_resp", scalar(Float)),
    ("w_rho", scalar(Float)),
    ("w_torque", scalar(Float)),
    ("wavenumber_tol", scalar(Float)),
    ("weight", scalar(Float)),
    ("whamboltz", scalar(Bool)),
    ("writelevel", scalar(Int)),
];

/// Job types the optimizer accepts, after uppercasing.
pub const JOB_TYPES: &[&str] = &[
    "SINGLE",
    "GRADIENT",
    "HESSIAN",
    "OPTIMIZE",
    "NEWTONRAPHSON",
    "BFGS",
    "SCIPY_BFGS",
    "POWELL",
    "SIMPLEX",
    "ANNEAL",
    "BASIN",
    "GENETIC",
    "CONJUGATEGRADIENT",
    "TNC",
    "NEWTONCG",
    "SCAN_MVALS",
    "SCAN_PVALS",
    "FDCHECKG",
    "FDCHECKH",
];

/// Look up the schema entry of `key` in the given block.
pub fn lookup(block: OptionBlock, key: &str) -> Option<OptionSpec> {
    let table = match block {
        OptionBlock::General => GENERAL_OPTIONS,
        OptionBlock::Target => TARGET_OPTIONS,
    };
    table
        .binary_search_by(|(name, _)| (*name).cmp(key))
        .ok()
        .map(|idx| table[idx].1)
}

/// Normalize a job type: uppercase, with NEWTON folded into OPTIMIZE.
///
/// Returns `None` for values outside [`JOB_TYPES`].
pub fn canonical_job_type(raw: &str) -> Option<&'static str> {
    let upper = raw.to_uppercase();
    let upper = if upper == "NEWTON" { "OPTIMIZE" } else { &upper };
    JOB_TYPES.iter().copied().find(|job| *job == upper)
}
