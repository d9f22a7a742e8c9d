use miette::Result;
use wayfind_core::version::BuildInfo;

use super::print_json;

pub fn run(json: bool) -> Result<()> {
    let info = BuildInfo::current();
    if json {
        print_json(&info)
    } else {
        println!("{info}");
        Ok(())
    }
}
