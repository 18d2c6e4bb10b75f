pub mod epi;
pub mod one_pulse;
pub mod pgse;
pub mod q_calc;
pub mod spin_echo;

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use seq_tools::scanner::Scanner;
use seq_tools::sequence::Sequence;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A data structure that compiles to a pulse sequence. Parameter structs
/// serialize to json so protocols can be stored next to their data.
pub trait SequenceParameters: Serialize + DeserializeOwned + Default {
    fn name(&self) -> String;
    fn build(&self, scanner: &Scanner) -> Sequence;

    fn write(&self, params_file: &Path) {
        let mut f = File::create(params_file)
            .expect(&format!("cannot create file {:?}", params_file));
        let str = serde_json::to_string_pretty(&self).expect("cannot serialize struct");
        f.write_all(str.as_bytes()).expect("trouble writing to file");
    }

    fn load(params_file: &Path) -> Self {
        let mut f = File::open(params_file)
            .expect(&format!("cannot open file {:?}", params_file));
        let mut in_str = String::new();
        f.read_to_string(&mut in_str).expect("trouble reading file");
        serde_json::from_str(&in_str).expect("cannot deserialize struct")
    }
}
