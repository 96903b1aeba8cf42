//! Static routing table with longest-prefix-match lookup.

use core::fmt;

use crate::net::ip::IpAddress;

/// One routing entry. `interface` is the 1-based port number the packet
/// leaves through; a gateway of `0.0.0.0` means the destination is on-link.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Route {
    pub destination: IpAddress,
    pub mask: IpAddress,
    pub gateway: IpAddress,
    pub interface: usize,
}

impl Route {
    pub fn new(
        destination: IpAddress,
        mask: IpAddress,
        gateway: IpAddress,
        interface: usize,
    ) -> Route {
        Route {
            destination,
            mask,
            gateway,
            interface,
        }
    }

    /// True if `ip` falls under this route.
    pub fn matches(&self, ip: IpAddress) -> bool {
        ip.in_subnet(self.destination, self.mask)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.destination, self.mask, self.gateway, self.interface
        )
    }
}

/// Route list kept sorted most-specific first.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> RouteTable {
        RouteTable { routes: Vec::new() }
    }

    /// Insert a route, keeping longer masks ahead of shorter ones. Ties keep
    /// insertion order.
    pub fn add(&mut self, route: Route) {
        self.routes.push(route);
        self.routes
            .sort_by_key(|r| core::cmp::Reverse(r.mask.raw()));
    }

    /// Remove the first route equal to `route`, if present.
    pub fn remove(&mut self, route: &Route) {
        if let Some(pos) = self.routes.iter().position(|r| r == route) {
            self.routes.remove(pos);
        }
    }

    /// Drop every route.
    pub fn reset(&mut self) {
        self.routes.clear();
    }

    /// Longest-prefix match: the first stored route that covers `ip`.
    pub fn lookup(&self, ip: IpAddress) -> Option<&Route> {
        self.routes.iter().find(|r| r.matches(ip))
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
