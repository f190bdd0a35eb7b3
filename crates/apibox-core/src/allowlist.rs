use std::net::{IpAddr, Ipv4Addr};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AllowListError {
    #[error("malformed allow-list entry: {0:?}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Single(IpAddr),
    /// Inclusive range `a.b.c.d-e.f.g.h`, parsed as a proper range test
    /// rather than as two separate endpoint entries.
    Range(u32, u32),
    Cidr(u32, u32),
}

fn ipv4_to_u32(ip: Ipv4Addr) -> u32 {
    u32::from(ip)
}

fn parse_ipv4(s: &str) -> Option<Ipv4Addr> {
    s.trim().parse().ok()
}

impl Entry {
    fn parse(raw: &str) -> Result<Self, AllowListError> {
        let raw = raw.trim();
        if let Some((lo, hi)) = raw.split_once('-') {
            let lo = parse_ipv4(lo).ok_or_else(|| AllowListError::Malformed(raw.to_string()))?;
            let hi = parse_ipv4(hi).ok_or_else(|| AllowListError::Malformed(raw.to_string()))?;
            return Ok(Entry::Range(ipv4_to_u32(lo), ipv4_to_u32(hi)));
        }
        if let Some((addr, prefix)) = raw.split_once('/') {
            let addr =
                parse_ipv4(addr).ok_or_else(|| AllowListError::Malformed(raw.to_string()))?;
            let prefix: u32 = prefix
                .trim()
                .parse()
                .ok()
                .filter(|p| *p <= 32)
                .ok_or_else(|| AllowListError::Malformed(raw.to_string()))?;
            let mask = if prefix == 0 {
                0
            } else {
                u32::MAX << (32 - prefix)
            };
            return Ok(Entry::Cidr(ipv4_to_u32(addr) & mask, mask));
        }
        let ip: IpAddr = raw
            .parse()
            .map_err(|_| AllowListError::Malformed(raw.to_string()))?;
        Ok(Entry::Single(ip))
    }

    fn permits(&self, ip: IpAddr) -> bool {
        match self {
            Entry::Single(allowed) => *allowed == ip,
            Entry::Range(lo, hi) => match ip {
                IpAddr::V4(v4) => {
                    let v = ipv4_to_u32(v4);
                    v >= *lo && v <= *hi
                }
                IpAddr::V6(_) => false,
            },
            Entry::Cidr(base, mask) => match ip {
                IpAddr::V4(v4) => (ipv4_to_u32(v4) & mask) == *base,
                IpAddr::V6(_) => false,
            },
        }
    }
}

/// IP allow-list supporting individual addresses, inclusive dotted-quad
/// ranges (`a.b.c.d-e.f.g.h`), and CIDR blocks. A malformed entry is
/// rejected outright at parse time rather than silently dropped or left in
/// the list to trip up a later lookup.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    entries: Vec<Entry>,
}

impl AllowList {
    pub fn parse(raw: &[String]) -> Result<Self, AllowListError> {
        let entries = raw
            .iter()
            .map(|s| Entry::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    pub fn permits(&self, ip: IpAddr) -> bool {
        self.entries.iter().any(|e| e.permits(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn single_ip_matches_exactly() {
        let list = AllowList::parse(&["10.0.0.1".to_string()]).unwrap();
        assert!(list.permits(ip("10.0.0.1")));
        assert!(!list.permits(ip("10.0.0.2")));
    }

    #[test]
    fn range_is_inclusive_on_both_endpoints() {
        let list = AllowList::parse(&["10.0.0.5-10.0.0.9".to_string()]).unwrap();
        assert!(list.permits(ip("10.0.0.5")));
        assert!(list.permits(ip("10.0.0.9")));
        assert!(list.permits(ip("10.0.0.7")));
        assert!(!list.permits(ip("10.0.0.10")));
        assert!(!list.permits(ip("10.0.0.4")));
    }

    #[test]
    fn cidr_block_membership() {
        let list = AllowList::parse(&["10.0.0.0/8".to_string()]).unwrap();
        assert!(list.permits(ip("10.255.1.2")));
        assert!(!list.permits(ip("11.0.0.1")));
    }

    #[test]
    fn malformed_entry_is_rejected_at_parse_time() {
        assert!(AllowList::parse(&["not-an-ip".to_string()]).is_err());
        assert!(AllowList::parse(&["10.0.0.1-nope".to_string()]).is_err());
    }
}
