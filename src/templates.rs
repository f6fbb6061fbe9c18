//! Built-in Q-Chem input templates and their default values
//!
//! Templates use TinyTemplate placeholders (`{basis}`). Values are taken from [`defaults`] first
//! and then overridden by whatever the caller supplies.

use serde_json::{json, Map, Value};
use tinytemplate::{format_unescaped, TinyTemplate};

const ADC: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/adc.txt"));
const ADC_IN_HF: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/adc_in_hf.txt"));
const HF_CHELPG: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/hf_chelpg.txt"));
const ALMO2_HF: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/almo2_hf.txt"));
const OPT_FREQ: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/opt_freq.txt"));

static BUILTIN: [(&str, &str); 5] = [
    ("adc", ADC),
    ("adc_in_hf", ADC_IN_HF),
    ("hf_chelpg", HF_CHELPG),
    ("almo2_hf", ALMO2_HF),
    ("opt_freq", OPT_FREQ),
];

/// CO fragment used as the default geometry
static FRAG_A: &str = "C        -3.6180905689    1.3768035675   -0.0207958979
O        -4.7356838533    1.5255563000    0.1150239130";

/// Water fragment used as the default environment
static FRAG_B: &str = "O        -7.9563726699    1.4854060709    0.1167920007
H        -6.9923165534    1.4211335985    0.1774706091
H        -8.1058463545    2.4422204631    0.1115993752";

/// Point charges of the water fragment
static POINT_CHARGES: &str = "-7.9563726699    1.4854060709    0.1167920007    -0.8
-6.9923165534    1.4211335985    0.1774706091     0.4
-8.1058463545    2.4422204631    0.1115993752     0.4";

pub fn builtin(name: &str) -> Option<&'static str> {
    BUILTIN
        .iter()
        .find(|(builtin_name, _)| *builtin_name == name)
        .map(|(_, template)| *template)
}

pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|(name, _)| *name)
}

/// Default substitution values shared by all templates
pub fn defaults() -> Map<String, Value> {
    let defaults = json!({
        "basis": "cc-pVDZ",
        "charge": 0,
        "charge_tot": 0,
        "charge_a": 0,
        "charge_b": 0,
        "expansion": "SE",
        "frag_a": FRAG_A,
        "frag_b": FRAG_B,
        "memory": 15000,
        "method": "HF",
        "molden": "false",
        "multiplicity": 1,
        "multiplicity_tot": 1,
        "multiplicity_a": 1,
        "multiplicity_b": 1,
        "nstates": 0,
        "t_func": "TF",
        "xc_func": "PBE",
        "x_func": "Slater",
        "c_func": "VWN5",
        "xc_func_b": "PBE",
        "xyz": FRAG_A,
        "print_orbitals": 15,
        "point_charges": POINT_CHARGES,
        "aux_memory": 20000,
        "comment": "generated from CCJob.Templates",
        "opt_conv_energy": 150,
        "opt_conv_displace": 1200,
        "opt_conv_grad": 300,
        "opt_max_cycles": 50,
        "opt_dmax": 300
    });
    match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Render a template over the defaults merged with `vars`
pub fn render(template: &str, vars: &Map<String, Value>) -> Result<String, tinytemplate::error::Error> {
    let mut context = defaults();
    for (key, value) in vars {
        context.insert(key.clone(), value.clone());
    }

    let mut tt = TinyTemplate::new();
    // input files are plain text, never HTML
    tt.set_default_formatter(&format_unescaped);
    tt.add_template("input", template)?;
    tt.render("input", &Value::Object(context))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_renders_with_defaults() {
        for name in builtin_names() {
            let template = builtin(name).unwrap();
            let rendered = render(template, &Map::new()).unwrap();
            assert!(rendered.contains("$molecule"), "{name} has no molecule section");
            assert!(!rendered.contains('{'), "{name} left a placeholder");
        }
    }

    #[test]
    fn user_values_win_over_defaults() {
        let mut vars = Map::new();
        vars.insert("nstates".to_string(), json!(4));
        vars.insert("comment".to_string(), json!("excited states"));
        let rendered = render(builtin("adc").unwrap(), &vars).unwrap();
        assert!(rendered.contains("ee_states = 4"));
        assert!(rendered.contains("excited states"));
        assert!(rendered.contains("basis = cc-pVDZ"));
    }

    #[test]
    fn multi_line_values_are_not_escaped() {
        let rendered = render("{frag_b}", &Map::new()).unwrap();
        assert_eq!(rendered.lines().count(), 3);
        assert!(rendered.starts_with("O "));
    }

    #[test]
    fn default_comment_is_rendered() {
        assert_eq!(defaults()["comment"], json!("generated from CCJob.Templates"));
        let rendered = render(builtin("adc").unwrap(), &Map::new()).unwrap();
        assert!(rendered.contains("generated from CCJob.Templates"));
    }

    #[test]
    fn unknown_template_name() {
        assert!(builtin("ccsd").is_none());
    }
}
