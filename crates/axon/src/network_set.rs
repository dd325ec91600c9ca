//! Named group of networks owned by one player
//!
//! Each member network answers one strategic question ("expansion",
//! "development", "threat"...). The set copies, mutates and repairs its
//! members together and tags their mutation logs with a one-letter prefix.

use thiserror::Error;

use crate::error::NetworkError;
use crate::mutation::MutationConfig;
use crate::network::Network;
use crate::rng::MutationRng;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkSetError {
    #[error("no network named '{0}'")]
    UnknownNetwork(String),

    #[error("network '{name}': {source}")]
    Network {
        name: String,
        #[source]
        source: NetworkError,
    },

    #[error("could not copy connections into: {}", .names.join(", "))]
    Incompatible { names: Vec<String> },
}

#[derive(Debug, Clone)]
struct Member {
    name: String,
    prefix: String,
    network: Network,
}

#[derive(Debug, Clone, Default)]
pub struct NetworkSet {
    members: Vec<Member>,
}

fn log_prefix(name: &str) -> String {
    name.chars().next().map(|c| c.to_uppercase().collect()).unwrap_or_default()
}

impl NetworkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the network called `name`. Insertion order is kept.
    pub fn insert(&mut self, name: impl Into<String>, network: Network) {
        let name = name.into();
        if let Some(member) = self.members.iter_mut().find(|m| m.name == name) {
            member.network = network;
            return;
        }
        self.members.push(Member {
            prefix: log_prefix(&name),
            name,
            network,
        });
    }

    pub fn get(&self, name: &str) -> Option<&Network> {
        self.members.iter().find(|m| m.name == name).map(|m| &m.network)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Network> {
        self.members
            .iter_mut()
            .find(|m| m.name == name)
            .map(|m| &mut m.network)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Network)> {
        self.members.iter().map(|m| (m.name.as_str(), &m.network))
    }

    pub fn evaluate(&mut self, name: &str, inputs: &[f32]) -> Result<Vec<f32>, NetworkSetError> {
        let network = self
            .get_mut(name)
            .ok_or_else(|| NetworkSetError::UnknownNetwork(name.to_string()))?;
        network.evaluate(inputs).map_err(|source| NetworkSetError::Network {
            name: name.to_string(),
            source,
        })
    }

    /// Copy weights from the same-named networks of `other`. Members that are
    /// missing from `other` are skipped; members whose shapes diverged keep
    /// their weights and are listed in the error.
    pub fn copy_connections_from(&mut self, other: &NetworkSet) -> Result<(), NetworkSetError> {
        let mut failed = Vec::new();
        for member in &mut self.members {
            let Some(source) = other.get(&member.name) else {
                continue;
            };
            if let Err(e) = member.network.copy_connections_from(source) {
                log::warn!("{}: {e}", member.name);
                failed.push(member.name.clone());
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(NetworkSetError::Incompatible { names: failed })
        }
    }

    /// Make every member an exact replica of its counterpart in `other`
    pub fn copy_networks_from(&mut self, other: &NetworkSet) {
        for member in &mut self.members {
            if let Some(source) = other.get(&member.name) {
                member.network.copy_network_from(source);
            }
        }
    }

    /// Mutate every member. Returns the structural changes tagged per member,
    /// e.g. `[E:(N1)][T:(L2 3)]`; members that kept their shape are left out.
    pub fn mutate_asexual<R: MutationRng + ?Sized>(
        &mut self,
        config: &MutationConfig,
        rng: &mut R,
    ) -> String {
        let mut log = String::new();
        for member in &mut self.members {
            let report = member.network.mutate_asexual(config, rng);
            if report.has_topology_changes() {
                log.push_str(&format!("[{}:{}]", member.prefix, report));
            }
        }
        log
    }

    pub fn refresh_connections(&mut self) {
        for member in &mut self.members {
            member.network.refresh_connections();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::TopologyChange;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn player_set(rng: &mut Xoshiro256PlusPlus) -> NetworkSet {
        let mut set = NetworkSet::new();
        set.insert("expansion", Network::new(&[3, 4, 1], rng).unwrap());
        set.insert("development", Network::new(&[2, 2, 1], rng).unwrap());
        set.insert("threat", Network::new(&[4, 3, 1], rng).unwrap());
        set
    }

    #[test]
    fn test_insert_keeps_order_and_replaces() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let mut set = player_set(&mut rng);
        set.insert("development", Network::uniform(&[2, 1], 1.0, 0.0).unwrap());

        assert_eq!(set.len(), 3);
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["expansion", "development", "threat"]);
        assert_eq!(set.get("development").unwrap().layer_count(), 2);
        assert!(set.get("economy").is_none());
    }

    #[test]
    fn test_evaluate_by_name() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
        let mut set = player_set(&mut rng);

        assert_eq!(set.evaluate("development", &[0.5, 0.5]).unwrap().len(), 1);
        assert_eq!(
            set.evaluate("economy", &[0.5]),
            Err(NetworkSetError::UnknownNetwork("economy".to_string()))
        );
        assert!(matches!(
            set.evaluate("threat", &[0.5]),
            Err(NetworkSetError::Network { .. })
        ));
    }

    #[test]
    fn test_copy_connections_reports_incompatible_members() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let mut ours = player_set(&mut rng);
        let mut theirs = player_set(&mut rng);
        theirs.insert("threat", Network::new(&[4, 5, 1], &mut rng).unwrap());

        let err = ours.copy_connections_from(&theirs).unwrap_err();

        assert_eq!(
            err,
            NetworkSetError::Incompatible {
                names: vec!["threat".to_string()]
            }
        );
        assert_eq!(
            ours.get("expansion").unwrap().layers()[0][0].connections(),
            theirs.get("expansion").unwrap().layers()[0][0].connections()
        );
    }

    #[test]
    fn test_copy_networks_mirrors_everything() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(4);
        let mut ours = player_set(&mut rng);
        let mut theirs = player_set(&mut rng);
        theirs.insert("threat", Network::new(&[4, 5, 2, 1], &mut rng).unwrap());

        ours.copy_networks_from(&theirs);

        for ((_, a), (_, b)) in ours.iter().zip(theirs.iter()) {
            assert_eq!(a.layers(), b.layers());
        }
    }

    #[test]
    fn test_mutation_log_is_prefixed() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        let mut set = player_set(&mut rng);
        let config = MutationConfig {
            new_node_prob: 1.0,
            ..MutationConfig::frozen()
        };

        let log = set.mutate_asexual(&config, &mut rng);

        let grown = TopologyChange::NodeAdded { layer: 1 };
        assert_eq!(log, format!("[E:{grown}][D:{grown}][T:{grown}]"));
        assert_eq!(log_prefix("threat"), "T");
        assert_eq!(log_prefix(""), "");

        assert_eq!(set.mutate_asexual(&MutationConfig::frozen(), &mut rng), "");
    }

    #[test]
    fn test_refresh_members() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(6);
        let mut set = player_set(&mut rng);
        let before = set.clone();

        set.refresh_connections();

        for ((_, a), (_, b)) in set.iter().zip(before.iter()) {
            assert_eq!(a.layers(), b.layers());
        }
    }
}
