//! bruteguard follows the host's authentication journal for repeated failed
//! SSH logins and drops further traffic from offending addresses by adding
//! them to an ipset matched by an iptables rule.

pub mod config;
pub mod detection;
pub mod monitor;
pub mod prevention;
pub mod supervisor;
pub mod utils;
