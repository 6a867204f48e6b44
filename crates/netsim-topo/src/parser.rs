use std::collections::HashMap;

use crate::error::TopologyError;

/// A parsed `link` directive: an undirected pairing with the attributes
/// that will become two directed `netsim_core::Link`s once addresses are
/// attached to each side.
#[derive(Debug, Clone)]
pub struct LinkSpec {
    pub a: String,
    pub b: String,
    pub bandwidth: f64,
    pub propagation: f64,
    pub queue_size: Option<usize>,
    pub loss: f64,
}

/// The parsed form of a topology file: declared hosts, undirected link
/// specs, and a per-(host, peer) address table, still unattached to any
/// `Simulation`. See [`crate::builder::build`] to materialize it.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub nodes: Vec<String>,
    pub links: Vec<LinkSpec>,
    pub addresses: HashMap<(String, String), u32>,
}

/// Parses the whitespace-separated topology grammar:
///
/// ```text
/// # comment
/// node <hostname>
/// link <hostA> <hostB> bandwidth=<bps> propagation=<seconds> [queue_size=<n>] [loss=<p>]
/// address <hostname> <peer> <address>
/// ```
pub fn parse(text: &str) -> Result<Topology, TopologyError> {
    let mut topo = Topology::default();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let directive = tokens.next().unwrap();

        match directive {
            "node" => {
                let host = require_token(tokens.next(), line_no, "hostname")?;
                if topo.nodes.contains(&host) {
                    return Err(TopologyError::DuplicateNode {
                        line: line_no,
                        host,
                    });
                }
                topo.nodes.push(host);
            }
            "link" => {
                let a = require_token(tokens.next(), line_no, "hostA")?;
                let b = require_token(tokens.next(), line_no, "hostB")?;
                let attrs = parse_attrs(tokens, line_no)?;
                let bandwidth = required_f64(&attrs, line_no, "bandwidth")?;
                let propagation = required_f64(&attrs, line_no, "propagation")?;
                let queue_size = match attrs.get("queue_size") {
                    Some(v) => Some(parse_usize(v, line_no, "queue_size")?),
                    None => None,
                };
                let loss = match attrs.get("loss") {
                    Some(v) => parse_f64(v, line_no, "loss")?,
                    None => 0.0,
                };
                topo.links.push(LinkSpec {
                    a,
                    b,
                    bandwidth,
                    propagation,
                    queue_size,
                    loss,
                });
            }
            "address" => {
                let host = require_token(tokens.next(), line_no, "hostname")?;
                let peer = require_token(tokens.next(), line_no, "peer")?;
                let addr = require_token(tokens.next(), line_no, "address")?;
                let addr: u32 = addr.parse().map_err(|_| TopologyError::InvalidNumber {
                    line: line_no,
                    attr: "address".to_string(),
                    value: addr.clone(),
                })?;
                topo.addresses.insert((host, peer), addr);
            }
            other => {
                return Err(TopologyError::UnknownDirective {
                    line: line_no,
                    text: other.to_string(),
                });
            }
        }
    }

    for spec in &topo.links {
        for host in [&spec.a, &spec.b] {
            if !topo.nodes.contains(host) {
                return Err(TopologyError::UnknownHost {
                    line: 0,
                    host: host.clone(),
                });
            }
        }
    }

    Ok(topo)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn require_token(tok: Option<&str>, line: usize, attr: &str) -> Result<String, TopologyError> {
    tok.map(str::to_string).ok_or_else(|| TopologyError::MissingAttribute {
        line,
        attr: attr.to_string(),
    })
}

fn parse_attrs<'a>(
    tokens: impl Iterator<Item = &'a str>,
    line: usize,
) -> Result<HashMap<String, String>, TopologyError> {
    let mut attrs = HashMap::new();
    for tok in tokens {
        let (key, value) = tok.split_once('=').ok_or_else(|| TopologyError::MissingAttribute {
            line,
            attr: tok.to_string(),
        })?;
        attrs.insert(key.to_string(), value.to_string());
    }
    Ok(attrs)
}

fn required_f64(
    attrs: &HashMap<String, String>,
    line: usize,
    attr: &str,
) -> Result<f64, TopologyError> {
    let value = attrs.get(attr).ok_or_else(|| TopologyError::MissingAttribute {
        line,
        attr: attr.to_string(),
    })?;
    parse_f64(value, line, attr)
}

fn parse_f64(value: &str, line: usize, attr: &str) -> Result<f64, TopologyError> {
    value.parse().map_err(|_| TopologyError::InvalidNumber {
        line,
        attr: attr.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(value: &str, line: usize, attr: &str) -> Result<usize, TopologyError> {
    value.parse().map_err(|_| TopologyError::InvalidNumber {
        line,
        attr: attr.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_two_host_topology() {
        let text = "\
# a simple point-to-point topology
node A
node B
link A B bandwidth=1000000 propagation=0.001 queue_size=3 loss=0.01
address A B 1
address B A 2
";
        let topo = parse(text).unwrap();
        assert_eq!(topo.nodes, vec!["A", "B"]);
        assert_eq!(topo.links.len(), 1);
        let link = &topo.links[0];
        assert_eq!(link.bandwidth, 1_000_000.0);
        assert_eq!(link.propagation, 0.001);
        assert_eq!(link.queue_size, Some(3));
        assert_eq!(link.loss, 0.01);
        assert_eq!(topo.addresses.get(&("A".to_string(), "B".to_string())), Some(&1));
    }

    #[test]
    fn link_attributes_are_optional_beyond_bandwidth_and_propagation() {
        let text = "node A\nnode B\nlink A B bandwidth=500 propagation=0.0\n";
        let topo = parse(text).unwrap();
        assert_eq!(topo.links[0].queue_size, None);
        assert_eq!(topo.links[0].loss, 0.0);
    }

    #[test]
    fn rejects_link_to_undeclared_host() {
        let text = "node A\nlink A B bandwidth=500 propagation=0.0\n";
        assert!(parse(text).is_err());
    }

    #[test]
    fn rejects_duplicate_node_declaration() {
        let text = "node A\nnode A\n";
        assert!(matches!(
            parse(text),
            Err(TopologyError::DuplicateNode { .. })
        ));
    }

    #[test]
    fn rejects_unknown_directive() {
        let text = "frobnicate A\n";
        assert!(matches!(
            parse(text),
            Err(TopologyError::UnknownDirective { .. })
        ));
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let text = "\n# just a comment\n  \nnode A\n";
        let topo = parse(text).unwrap();
        assert_eq!(topo.nodes, vec!["A"]);
    }
}
