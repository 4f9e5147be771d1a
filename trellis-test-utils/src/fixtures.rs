//! Ready-made type registries

use trellis_core::{TypeDef, TypeRegistry};

/// Every type of the `demo` namespace, for pattern-based permissions.
pub const DEMO_TYPES: &str = "demo.*";

/// Registry with a small but varied domain:
///
/// - `demo.Person { first, last }` and `demo.Employee extends demo.Person { badge }`
/// - `demo.Shape` interface implemented by `demo.Circle { radius }` and
///   `demo.Square { side }`, used by `demo.Drawing { title, shape }`
/// - `demo.Color` enum (`Red`, `Green`, `Blue`)
/// - `demo.Money { amount, currency }` and `demo.Wallet { owner, cash }`
/// - `demo.Team { name, lead, members }` with a list of people
/// - `demo.Node { label, next, children }` for cyclic graphs
/// - `demo.Secret { payload }`, never allowed by default
pub fn demo_registry() -> TypeRegistry {
    TypeRegistry::builder()
        .register(
            TypeDef::structure("demo.Person")
                .field("first", "trellis.String")
                .field("last", "trellis.String"),
        )
        .register(
            TypeDef::structure("demo.Employee")
                .extends("demo.Person")
                .field("badge", "trellis.Int"),
        )
        .register(TypeDef::interface("demo.Shape"))
        .register(
            TypeDef::structure("demo.Circle")
                .implements("demo.Shape")
                .field("radius", "trellis.Int"),
        )
        .register(
            TypeDef::structure("demo.Square")
                .implements("demo.Shape")
                .field("side", "trellis.Int"),
        )
        .register(
            TypeDef::structure("demo.Drawing")
                .field("title", "trellis.String")
                .field("shape", "demo.Shape"),
        )
        .register(TypeDef::enumeration("demo.Color", ["Red", "Green", "Blue"]))
        .register(
            TypeDef::structure("demo.Money")
                .field("amount", "trellis.Int")
                .field("currency", "trellis.String"),
        )
        .register(
            TypeDef::structure("demo.Wallet")
                .field("owner", "demo.Person")
                .field("cash", "demo.Money")
                .field("color", "demo.Color"),
        )
        .register(
            TypeDef::structure("demo.Team")
                .field("name", "trellis.String")
                .field("lead", "demo.Person")
                .field("members", "trellis.List"),
        )
        .register(
            TypeDef::structure("demo.Node")
                .field("label", "trellis.String")
                .field("next", "demo.Node")
                .field("children", "trellis.List"),
        )
        .register(TypeDef::structure("demo.Secret").field("payload", "trellis.String"))
        .build()
        .expect("demo registry is consistent")
}
