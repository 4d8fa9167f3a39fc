//! Best-fit assignment of routes to vehicle slots.

use log::warn;

use crate::problem::VehicleSlot;
use crate::solution::{Route, CAPACITY_EPSILON};

/// Bind every unassigned route to the smallest unused slot that carries its load.
///
/// Routes are visited by descending load, slots by descending capacity.
/// Slots already held by a route are never handed out twice, and a route
/// no slot can carry stays unassigned and is flagged infeasible. The order of `routes` is left
/// untouched. Returns the number of routes assigned by this call.
pub fn assign_vehicles(routes: &mut [Route], slots: &[VehicleSlot]) -> usize {
    let mut available: Vec<&VehicleSlot> = slots
        .iter()
        .filter(|slot| {
            !routes
                .iter()
                .filter_map(|r| r.slot.as_ref())
                .any(|held| held.same_slot(slot))
        })
        .collect();
    available.sort_by(|a, b| b.capacity.total_cmp(&a.capacity));

    let mut order: Vec<usize> = (0..routes.len())
        .filter(|&i| !routes[i].is_assigned())
        .collect();
    order.sort_by(|&a, &b| routes[b].load.total_cmp(&routes[a].load));

    let mut assigned = 0;

    for index in order {
        let load = routes[index].load;

        // Capacities are descending, so the last fitting slot is the tightest.
        let best_fit = available
            .iter()
            .rposition(|slot| slot.capacity + CAPACITY_EPSILON >= load);

        match best_fit {
            Some(position) => {
                let slot = available.remove(position);
                routes[index].assign(slot.clone());
                assigned += 1;
            }
            None => {
                routes[index].feasible = false;
                warn!(
                    "No vehicle left for a route carrying {:.2} ({} stops)",
                    load,
                    routes[index].stop_count()
                );
            }
        }
    }

    assigned
}
