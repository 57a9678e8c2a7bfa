//! Generated contract bindings. Kept in their own file since `abigen!`
//! expands into a sizeable block of generated types that would otherwise
//! dwarf the hand-written code around it.

ethers::contract::abigen!(
    DrawbridgeContract,
    r#"[
        function deposit(uint256 tokens) external
        function spend(bytes inputs, bytes outputs) external
        function tokenAddress() external view returns (address)
        event Create(uint256 index, uint256 value, bytes script, bytes32 id)
        event Spend(uint256 id)
        event Withdrawal(address owner, uint256 value)
    ]"#,
);

ethers::contract::abigen!(
    Erc20,
    r#"[
        function approve(address spender, uint256 amount) external returns (bool)
        function balanceOf(address owner) external view returns (uint256)
    ]"#,
);
